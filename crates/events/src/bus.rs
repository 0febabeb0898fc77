//! Publish/subscribe abstraction (mechanics only).
//!
//! The bus distributes notices after the store has accepted a write. It is
//! not a source of truth: a subscriber that misses a notice re-reads the
//! store and is back in sync. Delivery is best-effort and at-least-once, so
//! handlers must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use billbook_core::TenantId;

use crate::tenant::TenantScoped;

/// A subscription to a notice stream (broadcast semantics: each
/// subscription sees every message published after it was created).
///
/// Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

impl<M: TenantScoped> Subscription<M> {
    /// Drain queued messages, keeping only those owned by `tenant_id`.
    pub fn drain_for_tenant(&self, tenant_id: TenantId) -> Vec<M> {
        self.receiver
            .try_iter()
            .filter(|m| m.tenant_id() == tenant_id)
            .collect()
    }
}

/// Transport-agnostic event bus.
///
/// ```text
/// write → RecordStore (commit) → EventBus (publish) → subscribers refresh
/// ```
///
/// `publish` may fail; the write it describes has already committed, so
/// callers log the failure rather than undoing the write.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
