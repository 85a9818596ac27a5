use crate::connection::Connection;
use crate::manager::Manager;
use crate::sink::{EventSink, ResponseHead};
use log::*;
use std::sync::Arc;

/// Callback run once when the underlying transport closes.
pub type CloseHook = Box<dyn FnOnce() + Send + 'static>;

/// Inbound subscription request as seen by the lifecycle.
pub trait SubscriptionRequest {
    /// Register `hook` to run when the connection closes, for whatever reason.
    fn on_close(&mut self, hook: CloseHook);
}

impl Manager {
    /// Turn an inbound request into a registered subscriber.
    ///
    /// Writes the event-stream head, builds the connection with `factory`,
    /// registers it and arranges for it to be removed when `request` closes.
    /// The subscriber is eligible for dispatch as soon as this returns.
    pub fn accept_subscription<R, F>(&self, request: &mut R, sink: Arc<dyn EventSink>, factory: F)
    where
        R: SubscriptionRequest,
        F: FnOnce(&R, Arc<dyn EventSink>) -> Connection,
    {
        if let Err(e) = sink.write_headers(&ResponseHead::event_stream()) {
            warn!("Subscriber left before the SSE response head was written: {e}");
            return;
        }

        let connection = factory(request, sink);
        let connection_id = connection.id.clone();
        self.register_connection(connection);

        let registry = Arc::clone(self.registry());
        request.on_close(Box::new(move || {
            debug!("SSE connection {} closed, cleaning up", connection_id);
            registry.remove(&connection_id);
        }));
    }
}
