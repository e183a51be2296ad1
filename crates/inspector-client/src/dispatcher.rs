//! Synchronous call dispatch
//!
//! The dispatcher drives an async [`Transport`] from a single-threaded runtime
//! and blocks the caller until the call resolves. Only one call is in flight
//! at a time: `invoke` takes `&mut self`.

use crate::sink::{MessageSink, ResponseSlot};
use crate::transport::Transport;
use inspector_core::{
    InspectorError, Notification, RequestEnvelope, Result, next_request_id,
};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::broadcast;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

/// How the dispatcher waits for a response once `send` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseWait {
    /// Take whatever arrived during `send`. If nothing did, the call resolves
    /// to `None`. Suited to in-process endpoints that answer synchronously.
    #[default]
    Immediate,
    /// Block until the response arrives or the transport fails. There is no
    /// timeout: an endpoint that never answers blocks the caller forever.
    Blocking,
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub response_wait: ResponseWait,
    /// Notifications buffered per subscriber before the oldest are dropped
    pub notification_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            response_wait: ResponseWait::Immediate,
            notification_capacity: 256,
        }
    }
}

impl DispatcherConfig {
    /// Configuration for endpoints that answer asynchronously (processes, sockets)
    pub fn blocking() -> Self {
        Self {
            response_wait: ResponseWait::Blocking,
            ..Self::default()
        }
    }
}

/// Executes one remote call per invocation
///
/// Must not be used from inside another async runtime; `invoke` blocks the
/// current thread.
pub struct Dispatcher {
    runtime: Runtime,
    transport: Box<dyn Transport>,
    sink: MessageSink,
    config: DispatcherConfig,
    connected: bool,
}

impl Dispatcher {
    /// Create a dispatcher over `transport` (not connected yet)
    pub fn new(transport: impl Transport + 'static, config: DispatcherConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InspectorError::TransportFault(format!("Failed to start runtime: {}", e)))?;

        Ok(Self {
            runtime,
            transport: Box::new(transport),
            sink: MessageSink::new(config.notification_capacity),
            config,
            connected: false,
        })
    }

    /// Open the transport. Calling it again is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.runtime
            .block_on(self.transport.connect(self.sink.clone()))?;
        self.connected = true;
        info!("Dispatcher connected");
        Ok(())
    }

    /// Close the transport, failing anything still waiting.
    /// Returns false if it was not connected.
    pub fn disconnect(&mut self) -> Result<bool> {
        if !self.connected {
            return Ok(false);
        }
        let result = self.runtime.block_on(self.transport.disconnect());
        // Nothing can answer once the transport is being torn down, even if it failed
        self.sink.fail_all("Disconnected");
        let closed = result?;
        self.connected = false;
        Ok(closed)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Invoke `method` (`Domain.command`) with `params` and wait for its response.
    ///
    /// Returns the response's `result`, or `None` when no result was delivered.
    /// The method name is not checked here; see [`crate::Inspector`] for
    /// registry-checked calls.
    pub fn invoke(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        if !self.connected {
            return Err(InspectorError::TransportFault("Not connected".into()));
        }

        let id = next_request_id();
        let mut slot = self.sink.register(id);
        let outcome = self.exchange(id, method, params, &mut slot);

        // A response that did not make it in time must never reach a later call
        if self.sink.forget(id) {
            debug!("Request {} cleared without a response", id);
        }
        outcome
    }

    fn exchange(
        &mut self,
        id: u64,
        method: &str,
        params: Option<serde_json::Value>,
        slot: &mut ResponseSlot,
    ) -> Result<Option<serde_json::Value>> {
        let message = RequestEnvelope::new(id, method, params).to_json()?;
        let preview: String = message.chars().take(200).collect();
        debug!("[proxy→endpoint] len={} json={}", message.len(), preview);

        self.runtime.block_on(self.transport.send(&message))?;

        let response = match self.config.response_wait {
            ResponseWait::Immediate => match slot.try_recv() {
                Ok(response) => response?,
                Err(TryRecvError::Empty) => {
                    warn!("No response to {} (request {}) after send", method, id);
                    return Ok(None);
                }
                Err(TryRecvError::Closed) => {
                    return Err(InspectorError::TransportFault(
                        "Response channel closed".into(),
                    ));
                }
            },
            ResponseWait::Blocking => self
                .runtime
                .block_on(slot)
                .map_err(|_| InspectorError::TransportFault("Response channel closed".into()))??,
        };

        response.into_result()
    }

    /// Subscribe to notifications pushed by the endpoint
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sink.subscribe()
    }
}
