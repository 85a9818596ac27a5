//! Error types for the push channel.

use std::fmt;

/// Errors raised while encoding, decoding or delivering events.
///
/// Only `Transport` is meant to reach end users; the dispatch engine absorbs
/// `WriteFailure` per connection and never hands it back to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The outbound payload could not be serialized to JSON.
    Serialization(String),

    /// An inbound frame's data segment was not valid JSON.
    Parse(String),

    /// A sink rejected a write, usually because the subscriber is already gone
    /// but has not been deregistered yet.
    WriteFailure(String),

    /// The client-side transport failed. The origin is opaque to this crate.
    Transport(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::WriteFailure(msg) => write!(f, "Write failure: {}", msg),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
