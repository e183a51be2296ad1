//! Inbound message routing
//!
//! Transports hand every message they receive to a [`MessageSink`]. Responses
//! are matched to the waiting call by request id; notifications are broadcast
//! to subscribers.

use inspector_core::{InboundMessage, InspectorError, Notification, ResponseEnvelope, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, warn};

/// Receiving half of a call's rendezvous
pub(crate) type ResponseSlot = oneshot::Receiver<Result<ResponseEnvelope>>;

/// Abandoned request ids remembered for late-delivery detection
const RETIRED_CAPACITY: usize = 64;

#[derive(Default)]
struct PendingCalls {
    /// Outstanding calls by request id
    waiting: HashMap<u64, oneshot::Sender<Result<ResponseEnvelope>>>,
    /// Ids this sink issued whose calls returned without a response, oldest first
    retired: VecDeque<u64>,
}

impl PendingCalls {
    fn retire(&mut self, id: u64) {
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(id);
    }

    /// Forget a retired id, returning true if it was one
    fn take_retired(&mut self, id: u64) -> bool {
        match self.retired.iter().position(|&r| r == id) {
            Some(index) => {
                self.retired.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Handle transports use to deliver inbound messages
#[derive(Clone)]
pub struct MessageSink {
    pending: Arc<Mutex<PendingCalls>>,
    events: broadcast::Sender<Notification>,
}

impl MessageSink {
    /// Create a sink buffering up to `notification_capacity` notifications per subscriber
    pub fn new(notification_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            pending: Arc::new(Mutex::new(PendingCalls::default())),
            events,
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingCalls> {
        // A panic while holding the lock leaves the map consistent
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a waiter for `id`
    pub(crate) fn register(&self, id: u64) -> ResponseSlot {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending();
        pending.waiting.insert(id, tx);
        rx
    }

    /// Drop the waiter for `id`. Returns true if it was still outstanding.
    pub(crate) fn forget(&self, id: u64) -> bool {
        let mut pending = self.pending();
        let outstanding = pending.waiting.remove(&id).is_some();
        if outstanding {
            pending.retire(id);
        }
        outstanding
    }

    /// Number of calls waiting for a response
    pub fn outstanding(&self) -> usize {
        self.pending().waiting.len()
    }

    /// Subscribe to notifications pushed by the endpoint
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Route one raw inbound message
    pub fn deliver(&self, raw: &str) {
        let preview: String = raw.chars().take(200).collect();
        debug!("[endpoint→proxy] len={} json={}", raw.len(), preview);

        match InboundMessage::parse(raw) {
            Ok(InboundMessage::Response(response)) => self.deliver_response(response),
            Ok(InboundMessage::Notification(notification)) => {
                if self.events.send(notification).is_err() {
                    debug!("Dropped notification, no subscribers");
                }
            }
            Err(e) => {
                error!("Failed to parse inbound message: {}", e);
                self.fail_all(&e.to_string());
            }
        }
    }

    fn deliver_response(&self, response: ResponseEnvelope) {
        let mut pending = self.pending();
        if let Some(waiter) = pending.waiting.remove(&response.id) {
            // Receiver may already be gone if the call gave up
            let _ = waiter.send(Ok(response));
            return;
        }

        // Nobody is waiting: a late answer to an abandoned call, or noise
        if pending.waiting.is_empty() {
            if pending.take_retired(response.id) {
                warn!(
                    "Dropping stale response {}, its call is no longer waiting",
                    response.id
                );
            } else {
                warn!("Dropping unsolicited response {}", response.id);
            }
            return;
        }

        // Someone is waiting for a different id
        let reason = format!(
            "Response id {} does not match any outstanding request",
            response.id
        );
        error!("{}", reason);
        for (_, waiter) in pending.waiting.drain() {
            let _ = waiter.send(Err(InspectorError::TransportFault(reason.clone())));
        }
    }

    /// Fail every outstanding call, e.g. when the channel is lost
    pub fn fail_all(&self, reason: &str) {
        let mut pending = self.pending();
        for (id, waiter) in pending.waiting.drain() {
            debug!("Failing request {}: {}", id, reason);
            let _ = waiter.send(Err(InspectorError::TransportFault(reason.to_string())));
        }
    }
}

impl std::fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSink")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
