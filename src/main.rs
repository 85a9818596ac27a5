use log::{error, info};
use service::{config::Config, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting push channel with SSE keep-alive {:?}",
        config.sse_keep_alive()
    );

    // The one connection registry of this process is created here and shared
    // by the subscription handler and every dispatcher.
    let app_state = AppState::new(config);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
