use crate::transport::{MessageEvent, Transport, TransportCallbacks, TransportHandle};
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use sse::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Transport backed by `eventsource-client`, running each stream as a task on
/// a tokio runtime. Automatic reconnects are disabled: a failed or finished
/// stream is reported once through `on_error` and the task ends.
#[derive(Clone)]
pub struct EventSourceTransport {
    runtime: Handle,
}

impl EventSourceTransport {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> Result<Self, Error> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| Error::Transport(format!("no tokio runtime available: {e}")))
    }
}

pub struct EventSourceHandle {
    task: Option<JoinHandle<()>>,
}

impl TransportHandle for EventSourceHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Transport for EventSourceTransport {
    type Handle = EventSourceHandle;

    fn open(&self, url: &str, callbacks: TransportCallbacks) -> Result<EventSourceHandle, Error> {
        let client = es::ClientBuilder::for_url(url)
            .map_err(|e| Error::Transport(format!("invalid SSE url {url}: {e}")))?
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();

        let url = url.to_string();
        let task = self.runtime.spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        (callbacks.on_message)(MessageEvent::new(event.data));
                    }
                    Some(Ok(es::SSE::Comment(_))) => {
                        trace!("Keep-alive from {}", url);
                    }
                    Some(Err(e)) => {
                        (callbacks.on_error)(Error::Transport(e.to_string()));
                        break;
                    }
                    None => {
                        debug!("SSE stream ended for {}", url);
                        (callbacks.on_error)(Error::Transport("stream closed by server".into()));
                        break;
                    }
                }
            }
        });

        Ok(EventSourceHandle { task: Some(task) })
    }
}
