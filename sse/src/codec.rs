//! Wire codec for a single-event-type SSE channel.
//!
//! Every event is written as `data: <compact json>\n\n`. No `event:` or `id:`
//! fields are emitted. Compact `serde_json` output escapes control characters,
//! so the JSON segment never contains a raw newline that would split the frame.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

const DATA_PREFIX: &str = "data: ";
const TERMINATOR: &str = "\n\n";
const KEEP_ALIVE: &str = ":\n\n";

/// One encoded event, ready to be written to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The JSON segment between the `data: ` prefix and the terminator.
    pub fn data(&self) -> &str {
        &self.0[DATA_PREFIX.len()..self.0.len() - TERMINATOR.len()]
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode `payload` into a wire frame.
pub fn encode<T>(payload: &T) -> Result<Frame>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(payload).map_err(|e| Error::Serialization(e.to_string()))?;

    let mut frame = String::with_capacity(DATA_PREFIX.len() + json.len() + TERMINATOR.len());
    frame.push_str(DATA_PREFIX);
    frame.push_str(&json);
    frame.push_str(TERMINATOR);

    Ok(Frame(frame))
}

/// Decode the data string of a message the transport has already split out.
pub fn decode<T>(data: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_str(data).map_err(|e| Error::Parse(e.to_string()))
}

/// Comment frame used to keep idle connections open. Clients ignore it.
pub fn keep_alive() -> &'static str {
    KEEP_ALIVE
}
