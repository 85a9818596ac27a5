use crate::error::{Error, Result};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use log::*;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Status line and headers of a subscription response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Head announcing a persistent, uncached text event stream.
    pub fn event_stream() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        Self {
            status: StatusCode::OK,
            headers,
        }
    }
}

/// Writable side of a subscriber's response stream.
///
/// Implementations must not block: dispatch writes to many sinks in sequence
/// and a slow subscriber must not hold up the others.
pub trait EventSink: Send + Sync {
    fn write_headers(&self, head: &ResponseHead) -> Result<()>;

    fn write_chunk(&self, chunk: &str) -> Result<()>;
}

/// What a [`ChannelSink`] hands to the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Head(ResponseHead),
    Data(Bytes),
}

/// Sink that forwards everything over an unbounded channel to the task
/// driving the HTTP response body.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Chunk>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<Chunk>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, UnboundedReceiver<Chunk>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn write_headers(&self, head: &ResponseHead) -> Result<()> {
        self.sender
            .send(Chunk::Head(head.clone()))
            .map_err(|e| Error::WriteFailure(e.to_string()))
    }

    fn write_chunk(&self, chunk: &str) -> Result<()> {
        trace!("Writing {} byte chunk to SSE channel", chunk.len());
        self.sender
            .send(Chunk::Data(Bytes::copy_from_slice(chunk.as_bytes())))
            .map_err(|e| Error::WriteFailure(e.to_string()))
    }
}
