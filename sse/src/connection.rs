use crate::message::UserKeys;
use crate::sink::EventSink;
use log::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Caller-supplied subscriber key; several connections may share one.
pub type UserId = String;

/// Unique identifier for a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A live subscriber: who it is and where its frames go.
#[derive(Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub sink: Arc<dyn EventSink>,
}

impl Connection {
    pub fn new(id: ConnectionId, user_id: impl Into<UserId>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            sink,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Entries {
    /// Primary storage in registration order
    connections: Vec<Connection>,

    /// Secondary index: user_id -> connection ids, for routing
    user_index: HashMap<UserId, HashSet<ConnectionId>>,
}

impl Entries {
    fn from_connections(connections: Vec<Connection>) -> Self {
        let mut entries = Self::default();
        for connection in connections {
            entries.insert(connection);
        }
        entries
    }

    fn insert(&mut self, connection: Connection) {
        if self.remove(&connection.id).is_some() {
            warn!(
                "Connection id {} registered twice, replacing the previous entry",
                connection.id
            );
        }

        self.user_index
            .entry(connection.user_id.clone())
            .or_default()
            .insert(connection.id.clone());
        self.connections.push(connection);
    }

    fn remove(&mut self, connection_id: &ConnectionId) -> Option<Connection> {
        let position = self
            .connections
            .iter()
            .position(|connection| &connection.id == connection_id)?;
        let connection = self.connections.remove(position);

        if let Some(ids) = self.user_index.get_mut(&connection.user_id) {
            ids.remove(connection_id);
            if ids.is_empty() {
                self.user_index.remove(&connection.user_id);
            }
        }

        Some(connection)
    }
}

/// Registry of live connections.
///
/// All reads and writes go through a single lock, so a reader always sees a
/// complete registry. Readers clone what they need and release the lock before
/// touching any sink.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<Entries>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave `Entries` half-updated, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole registry.
    pub fn set_all(&self, connections: Vec<Connection>) {
        let entries = Entries::from_connections(connections);
        *self.write() = entries;
    }

    /// Append a connection.
    pub fn add(&self, connection: Connection) {
        debug!(
            "Adding connection {} for user {}",
            connection.id, connection.user_id
        );
        self.write().insert(connection);
    }

    /// Remove a connection by id. Returns whether anything was removed;
    /// removing an unknown id is not an error.
    pub fn remove(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.write().remove(connection_id).is_some();
        if removed {
            debug!("Removed connection {}", connection_id);
        } else {
            trace!("Connection {} already removed", connection_id);
        }
        removed
    }

    /// Connections whose user id is one of `user_ids`, in registration order.
    pub fn find_by_user_keys(&self, user_ids: &UserKeys) -> Vec<Connection> {
        let entries = self.read();

        let wanted: HashSet<&ConnectionId> = user_ids
            .iter()
            .filter_map(|user_id| entries.user_index.get(user_id))
            .flatten()
            .collect();

        if wanted.is_empty() {
            return Vec::new();
        }

        entries
            .connections
            .iter()
            .filter(|connection| wanted.contains(&connection.id))
            .cloned()
            .collect()
    }

    /// Point-in-time copy of every connection.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.read().connections.clone()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.read()
            .connections
            .iter()
            .any(|connection| &connection.id == connection_id)
    }

    pub fn connection_count_for_user(&self, user_id: &str) -> usize {
        self.read().user_index.get(user_id).map_or(0, HashSet::len)
    }

    pub fn len(&self) -> usize {
        self.read().connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().connections.is_empty()
    }
}
