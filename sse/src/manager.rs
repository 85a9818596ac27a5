use crate::codec::{self, Frame};
use crate::connection::{Connection, ConnectionId, ConnectionRegistry};
use crate::message::{Message as SseMessage, MessageScope, UserKeys};
use log::*;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one dispatch, for logging and tests only. It says nothing about
/// whether a subscriber actually read the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
}

impl DispatchReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()))
    }

    pub fn with_registry(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register an already built connection
    pub fn register_connection(&self, connection: Connection) {
        info!(
            "Registered new SSE connection {} for user {}",
            connection.id, connection.user_id
        );
        self.registry.add(connection);
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        if self.registry.remove(connection_id) {
            info!("Unregistered SSE connection {}", connection_id);
        }
    }

    /// Send `payload` to every connection registered at call time.
    pub fn broadcast<T>(&self, payload: &T) -> DispatchReport
    where
        T: Serialize + ?Sized,
    {
        let Some(frame) = Self::encode(payload) else {
            return DispatchReport::default();
        };

        let report = Self::write_all(&self.registry.snapshot(), &frame);
        debug!(
            "Broadcast SSE event to {}/{} connection(s)",
            report.delivered, report.attempted
        );
        report
    }

    /// Send `payload` to every connection of the given user(s). Users without a
    /// live connection simply receive nothing.
    pub fn send_to_targets<K, T>(&self, user_ids: K, payload: &T) -> DispatchReport
    where
        K: Into<UserKeys>,
        T: Serialize + ?Sized,
    {
        let user_ids = user_ids.into();
        let targets = self.registry.find_by_user_keys(&user_ids);

        if targets.is_empty() {
            debug!("No live SSE connections for user(s) {:?}", user_ids);
            return DispatchReport::default();
        }

        let Some(frame) = Self::encode(payload) else {
            return DispatchReport::default();
        };

        let report = Self::write_all(&targets, &frame);
        debug!(
            "Sent SSE event to {}/{} connection(s) for user(s) {:?}",
            report.delivered, report.attempted, user_ids
        );
        report
    }

    /// Send a message based on its scope
    pub fn send_message<T>(&self, message: SseMessage<T>) -> DispatchReport
    where
        T: Serialize,
    {
        match message.scope {
            MessageScope::Users { user_ids } => self.send_to_targets(user_ids, &message.payload),
            MessageScope::Broadcast => self.broadcast(&message.payload),
        }
    }

    fn encode<T>(payload: &T) -> Option<Frame>
    where
        T: Serialize + ?Sized,
    {
        match codec::encode(payload) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                None
            }
        }
    }

    fn write_all(connections: &[Connection], frame: &Frame) -> DispatchReport {
        let mut report = DispatchReport {
            attempted: connections.len(),
            delivered: 0,
        };

        for connection in connections {
            match connection.sink.write_chunk(frame.as_str()) {
                Ok(()) => report.delivered += 1,
                Err(e) => warn!(
                    "Failed to send event to connection {}: {}. Connection will be cleaned up on close.",
                    connection.id, e
                ),
            }
        }

        report
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
