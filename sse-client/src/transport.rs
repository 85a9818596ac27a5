//! The seam between a [`ClientSession`](crate::session::ClientSession) and
//! whatever actually holds the HTTP stream open.

use sse::Error;

/// A message as delivered by the transport: the data of one event, with the
/// `data: ` framing already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub data: String,
}

impl MessageEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

pub type MessageCallback = Box<dyn Fn(MessageEvent) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync>;

/// Callbacks a transport invokes from whatever task it delivers events on.
pub struct TransportCallbacks {
    pub on_message: MessageCallback,
    pub on_error: ErrorCallback,
}

/// An open stream. Dropping a handle without closing it is allowed but may
/// leave the underlying connection running.
pub trait TransportHandle: Send + 'static {
    fn close(&mut self);
}

/// Opens streams to a URL.
pub trait Transport {
    type Handle: TransportHandle;

    fn open(&self, url: &str, callbacks: TransportCallbacks) -> Result<Self::Handle, Error>;
}
