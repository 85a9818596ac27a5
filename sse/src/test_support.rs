use crate::error::{Error, Result};
use crate::sink::{EventSink, ResponseHead};
use std::sync::Mutex;

/// Sink that remembers everything written to it.
#[derive(Default)]
pub(crate) struct RecordingSink {
    heads: Mutex<Vec<ResponseHead>>,
    chunks: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A sink whose subscriber has gone away.
    pub(crate) fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub(crate) fn heads(&self) -> Vec<ResponseHead> {
        self.heads.lock().unwrap().clone()
    }

    pub(crate) fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn write_headers(&self, head: &ResponseHead) -> Result<()> {
        if self.fail_writes {
            return Err(Error::WriteFailure("subscriber gone".to_string()));
        }
        self.heads.lock().unwrap().push(head.clone());
        Ok(())
    }

    fn write_chunk(&self, chunk: &str) -> Result<()> {
        if self.fail_writes {
            return Err(Error::WriteFailure("subscriber gone".to_string()));
        }
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(())
    }
}
