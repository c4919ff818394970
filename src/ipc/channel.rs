//! Correlated request/reply over an asynchronous transport
//!
//! Every call registers a one-shot listener under a fresh correlation id,
//! hands the envelope to the transport and waits for the matching reply or
//! the deadline. The listener is removed when the call settles, whichever
//! way it settles, including when the calling future is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use super::envelope::{CommandEnvelope, CorrelationId, Reply, ReplyPayload};
use crate::error::ErrorCode;

/// Outbound half of the link to the equalizer host
///
/// Sending is fire-and-forget. Replies arrive later through the [`Inbox`]
/// the transport was connected to.
pub trait Transport: Send + Sync {
    fn send(&self, envelope: CommandEnvelope);
}

/// Pending replies keyed by correlation id
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    pending: Arc<Mutex<HashMap<CorrelationId, oneshot::Sender<Reply>>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationId, oneshot::Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, correlation: CorrelationId) -> oneshot::Receiver<Reply> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(correlation, tx);
        rx
    }

    fn cancel(&self, correlation: CorrelationId) -> bool {
        self.lock().remove(&correlation).is_some()
    }

    /// Hand a reply to the waiting caller
    ///
    /// Returns false when nobody is waiting for it (late or unknown reply).
    pub fn deliver(&self, reply: Reply) -> bool {
        let Some(tx) = self.lock().remove(&reply.correlation) else {
            debug!(correlation = %reply.correlation, channel = %reply.channel, "reply without listener dropped");
            return false;
        };
        tx.send(reply).is_ok()
    }

    /// Number of calls still waiting for a reply
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// Removes the listener when the call settles
struct Listener<'a> {
    inbox: &'a Inbox,
    correlation: CorrelationId,
}

impl Drop for Listener<'_> {
    fn drop(&mut self) {
        if self.inbox.cancel(self.correlation) {
            trace!(correlation = %self.correlation, "listener removed");
        }
    }
}

/// Request/reply channel with a per-call deadline
pub struct CommandChannel {
    transport: Arc<dyn Transport>,
    inbox: Inbox,
    timeout: Duration,
}

impl CommandChannel {
    pub fn new(transport: Arc<dyn Transport>, inbox: Inbox, timeout: Duration) -> Self {
        Self {
            transport,
            inbox,
            timeout,
        }
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one command and wait for its reply
    ///
    /// Never fails: a missed deadline becomes `Error(Timeout)`, a reply for a
    /// different channel or an undecodable body becomes `Error(Unknown)`.
    pub async fn invoke(&self, channel: impl Into<String>, args: Vec<i64>) -> ReplyPayload {
        let envelope = CommandEnvelope::new(channel, args);
        let correlation = envelope.correlation;
        let channel = envelope.channel.clone();

        let rx = self.inbox.register(correlation);
        let _listener = Listener {
            inbox: &self.inbox,
            correlation,
        };

        trace!(%correlation, %channel, args = ?envelope.args, "send");
        self.transport.send(envelope);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) if reply.channel == channel => {
                let payload = ReplyPayload::decode(&reply.body);
                if let ReplyPayload::Error(code) = payload {
                    debug!(%correlation, %channel, ?code, "error reply");
                }
                payload
            }
            Ok(Ok(reply)) => {
                warn!(%correlation, expected = %channel, got = %reply.channel, "reply for another channel");
                ReplyPayload::Error(ErrorCode::Unknown)
            }
            Ok(Err(_)) => {
                warn!(%correlation, %channel, "reply sender dropped");
                ReplyPayload::Error(ErrorCode::Unknown)
            }
            Err(_) => {
                warn!(%correlation, %channel, timeout_ms = self.timeout.as_millis() as u64, "request timed out");
                ReplyPayload::Error(ErrorCode::Timeout)
            }
        }
    }
}
