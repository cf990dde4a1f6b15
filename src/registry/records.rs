//! Latch recorded for every registered capability.
//!
//! The table doubles as the duplicate-registration guard: a name is present
//! here exactly when it has been installed.

use crate::latch::LatchExpr;
use crate::registry::identity::CapabilityName;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub(crate) struct ActivationRecords {
    latches: BTreeMap<CapabilityName, LatchExpr>,
}

impl ActivationRecords {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.latches.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: CapabilityName, latch: LatchExpr) {
        self.latches.insert(name, latch);
    }

    pub(crate) fn latch(&self, name: &str) -> Option<&LatchExpr> {
        self.latches.get(name)
    }

    /// Names in stable (sorted) order.
    pub(crate) fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.latches.keys()
    }

    pub(crate) fn len(&self) -> usize {
        self.latches.len()
    }
}
