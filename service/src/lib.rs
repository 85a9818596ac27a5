use config::Config;
use sse::Manager;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The one connection registry of this process, plus dispatch on top of it.
    pub sse_manager: Arc<Manager>,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        Self::with_manager(app_config, Arc::new(Manager::new()))
    }

    pub fn with_manager(app_config: Config, sse_manager: Arc<Manager>) -> Self {
        Self {
            config: app_config,
            sse_manager,
        }
    }
}
