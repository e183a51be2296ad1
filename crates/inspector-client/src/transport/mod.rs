//! Transport abstractions
//!
//! A transport carries serialized request envelopes to the endpoint and hands
//! everything the endpoint sends back to a [`MessageSink`]. Implementations:
//! - [`local`]: in-process backend that answers inside `send`
//! - [`stdio`]: child process speaking newline-delimited JSON
//! - [`tcp`]: TCP socket with length-prefixed frames

pub mod local;
pub mod stdio;
pub mod tcp;

use crate::sink::MessageSink;
use async_trait::async_trait;
use inspector_core::Result;

/// Channel to an inspector endpoint
#[async_trait]
pub trait Transport: Send {
    /// Open the channel. Inbound messages must be delivered to `sink` from now on.
    async fn connect(&mut self, sink: MessageSink) -> Result<()>;

    /// Send one serialized request envelope
    async fn send(&mut self, message: &str) -> Result<()>;

    /// Close the channel. Returns false if it was not open.
    async fn disconnect(&mut self) -> Result<bool>;
}

pub use local::{Backend, LocalTransport};
pub use stdio::{ChildProcessConfig, ChildProcessTransport};
pub use tcp::TcpTransport;
