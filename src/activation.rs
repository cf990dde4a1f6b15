//! One-shot activation of capabilities that were registered too early.
//!
//! The host announces readiness exactly once through a [`ReadinessSignal`].
//! The [`ActivationTrigger`] (handed out by `Registry::finish` only when some
//! latch failed at registration) awaits that signal, re-evaluates every queued
//! latch in registration order, upgrades the ones that now hold, and drops the
//! queue. Both halves are consumed by use, so a second signal or a second
//! flush cannot be expressed.

use crate::environment::Environment;
use crate::registry::CapabilityName;
use crate::registry::pending::PendingQueue;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Create the readiness pair: the host keeps the signal, the trigger awaits
/// the listener.
pub fn readiness() -> (ReadinessSignal, ReadinessListener) {
    let (tx, rx) = oneshot::channel();
    (ReadinessSignal { tx }, ReadinessListener { rx })
}

/// Sending half of the readiness pair.
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: oneshot::Sender<()>,
}

impl ReadinessSignal {
    /// Announce that platform markers are now published.
    ///
    /// Firing when nobody listens (nothing was pending) is a no-op.
    pub fn fire(self) {
        if self.tx.send(()).is_err() {
            debug!("readiness fired with no activation pending");
        }
    }
}

/// Receiving half of the readiness pair.
#[derive(Debug)]
pub struct ReadinessListener {
    rx: oneshot::Receiver<()>,
}

impl ReadinessListener {
    /// Resolves `true` once the signal fires, `false` if the signal is dropped
    /// without firing.
    pub async fn ready(self) -> bool {
        self.rx.await.is_ok()
    }
}

/// Outcome of the flush.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Upgraded to their capability implementation, in registration order.
    pub activated: Vec<CapabilityName>,
    /// Latch still unsatisfied; permanently on fallback.
    pub fallback: Vec<CapabilityName>,
}

/// Owner of the pending queue between `Registry::finish` and readiness.
#[derive(Debug)]
pub struct ActivationTrigger {
    environment: Environment,
    pending: PendingQueue,
}

impl ActivationTrigger {
    pub(crate) fn new(environment: Environment, pending: PendingQueue) -> Self {
        Self {
            environment,
            pending,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queued names in registration order.
    pub fn pending_names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.pending.names()
    }

    /// Re-evaluate every queued latch and upgrade those that hold.
    pub fn flush(self) -> ActivationReport {
        let ActivationTrigger {
            environment,
            pending,
        } = self;
        let mut report = ActivationReport::default();
        for entry in pending {
            if environment.satisfies(&entry.latch) {
                debug!(capability = %entry.name, latch = %entry.latch, "activating capability");
                report.activated.push(entry.name.clone());
                entry.activate();
            } else {
                debug!(capability = %entry.name, latch = %entry.latch, "latch still unsatisfied");
                report.fallback.push(entry.name.clone());
            }
        }
        info!(
            activated = report.activated.len(),
            fallback = report.fallback.len(),
            "capability activation flushed"
        );
        report
    }

    /// Wait for readiness, then flush.
    ///
    /// Returns `None` when the signal is dropped without firing; every queued
    /// capability then stays on its fallback.
    pub async fn wait(self, listener: ReadinessListener) -> Option<ActivationReport> {
        if listener.ready().await {
            Some(self.flush())
        } else {
            warn!(
                pending = self.pending.len(),
                "readiness signal dropped before firing, capabilities stay on fallback"
            );
            None
        }
    }

    /// Run [`ActivationTrigger::wait`] as a task on the current tokio runtime.
    pub fn spawn(self, listener: ReadinessListener) -> JoinHandle<Option<ActivationReport>> {
        tokio::spawn(self.wait(listener))
    }
}
