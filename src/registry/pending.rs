//! Capabilities waiting for the readiness signal.
//!
//! An entry exists only for registrations whose latch failed at install time.
//! The queue is consumed whole by the activation flush; entries cannot be
//! replayed.

use crate::latch::LatchExpr;
use crate::registry::identity::CapabilityName;
use std::fmt;

pub(crate) struct PendingActivation {
    pub(crate) name: CapabilityName,
    pub(crate) latch: LatchExpr,
    activate: Box<dyn FnOnce() + Send>,
}

impl PendingActivation {
    pub(crate) fn new(
        name: CapabilityName,
        latch: LatchExpr,
        activate: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            name,
            latch,
            activate: Box::new(activate),
        }
    }

    /// Rebind the capability to its native implementation.
    pub(crate) fn activate(self) {
        (self.activate)()
    }
}

impl fmt::Debug for PendingActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingActivation")
            .field("name", &self.name)
            .field("latch", &self.latch.as_str())
            .finish_non_exhaustive()
    }
}

/// Registration-ordered queue.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    entries: Vec<PendingActivation>,
}

impl PendingQueue {
    pub(crate) fn push(&mut self, entry: PendingActivation) {
        self.entries.push(entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.entries.iter().map(|entry| &entry.name)
    }
}

impl IntoIterator for PendingQueue {
    type Item = PendingActivation;
    type IntoIter = std::vec::IntoIter<PendingActivation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
