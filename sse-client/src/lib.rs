//! Client side of the push channel: a [`ClientSession`](session::ClientSession)
//! subscribes to `/sse/events` for one or more user keys and hands decoded
//! JSON payloads to a message handler.
//!
//! The session talks to the network through the [`Transport`](transport::Transport)
//! trait. [`EventSourceTransport`](event_source::EventSourceTransport) is the
//! production implementation.

pub mod event_source;
pub mod output;
pub mod session;
pub mod transport;

pub use event_source::EventSourceTransport;
pub use session::{ClientSession, SessionState};
