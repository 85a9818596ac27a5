//! Server-Sent Events (SSE) push channel.
//!
//! This crate keeps track of live subscribers and pushes JSON events to all of
//! them or to the connections of specific users.
//!
//! # Architecture
//!
//! - **Explicit registry**: `ConnectionRegistry` is owned by the composition
//!   root and shared by `Arc`. There is no process-global state.
//! - **Several connections per user**: a user id may have any number of open
//!   connections (tabs, devices); targeted sends reach all of them.
//! - **Snapshot dispatch**: readers clone the matching connections under a read
//!   lock and write after releasing it, so a slow subscriber never blocks
//!   registration or other subscribers.
//! - **Fire-and-forget**: write failures are logged per connection and never
//!   reach the caller. Offline users miss the event.
//!
//! # Message Flow
//!
//! 1. A client opens `GET /sse/events?userId=...`
//! 2. `Manager::accept_subscription` writes the event-stream head, registers
//!    the connection and hooks its removal to the request's close signal
//! 3. Application code calls `Manager::broadcast` or `Manager::send_to_targets`
//! 4. The payload is encoded once (`data: <json>\n\n`) and written to each
//!    matching sink
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! app_state.sse_manager.send_to_targets(["user1", "user2"], &json!({ "message": "hi" }));
//! app_state.sse_manager.broadcast(&json!({ "message": "maintenance at noon" }));
//! ```
//!
//! # Modules
//!
//! - `codec`: wire frame encoding and decoding
//! - `connection`: `ConnectionRegistry` and the `Connection` record
//! - `lifecycle`: subscription acceptance and close-driven cleanup
//! - `manager`: dispatch to all or to targeted users
//! - `message`: `UserKeys` targets and scoped messages
//! - `sink`: the writable side of a subscriber's stream

pub mod codec;
pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod message;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;
pub use manager::Manager;
