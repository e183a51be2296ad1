//! In-process transport
//!
//! Used for endpoints embedded in the same process, where dispatching a message
//! produces its response synchronously before `send` returns.

use super::Transport;
use crate::sink::MessageSink;
use async_trait::async_trait;
use inspector_core::{InspectorError, Result};
use tracing::{debug, info};

/// An embedded protocol endpoint
pub trait Backend: Send {
    /// Handle one request envelope, writing any responses and notifications to `channel`
    fn dispatch(&mut self, message: &str, channel: &MessageSink);
}

impl<F> Backend for F
where
    F: FnMut(&str, &MessageSink) + Send,
{
    fn dispatch(&mut self, message: &str, channel: &MessageSink) {
        self(message, channel)
    }
}

/// Transport over an in-process [`Backend`]
pub struct LocalTransport<B: Backend> {
    backend: B,
    sink: Option<MessageSink>,
}

impl<B: Backend> LocalTransport<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sink: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }
}

#[async_trait]
impl<B: Backend> Transport for LocalTransport<B> {
    async fn connect(&mut self, sink: MessageSink) -> Result<()> {
        if self.sink.is_some() {
            debug!("Local session already connected");
            return Ok(());
        }
        info!("Local session connected");
        self.sink = Some(sink);
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| InspectorError::TransportFault("Not connected".into()))?;
        self.backend.dispatch(message, sink);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<bool> {
        let was_connected = self.sink.take().is_some();
        if was_connected {
            info!("Local session disconnected");
        }
        Ok(was_connected)
    }
}
