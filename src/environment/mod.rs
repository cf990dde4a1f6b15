//! Host-owned capability-marker namespace.
//!
//! The host writes markers as the platform comes up; the registry only reads
//! them when it evaluates latches. `Environment` is a cheap, cloneable handle
//! to the shared tree so both sides can hold it without a global.

pub mod marker;
pub mod path;
pub mod snapshot;

pub use marker::Marker;
pub use path::MarkerPath;
pub use snapshot::{
    EnvironmentSnapshot, SNAPSHOT_ENV_VAR, SNAPSHOT_SCHEMA_VERSION, default_snapshot_path,
};

use crate::latch::LatchExpr;
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;

/// Shared handle to the marker tree.
#[derive(Clone)]
pub struct Environment {
    root: Arc<RwLock<Marker>>,
}

impl Environment {
    /// An environment with no markers published yet.
    pub fn new() -> Self {
        Self::from_marker(Marker::node())
    }

    pub fn from_marker(root: Marker) -> Self {
        Self {
            root: Arc::new(RwLock::new(root)),
        }
    }

    pub fn from_snapshot(snapshot: EnvironmentSnapshot) -> Self {
        Self::from_marker(snapshot.markers)
    }

    /// Publish `value` at the dot-separated `path`.
    pub fn set(&self, path: &str, value: impl Into<Marker>) {
        self.root
            .write()
            .insert(&MarkerPath::parse(path), value.into());
    }

    /// Withdraw the marker at `path`, returning it if it existed.
    pub fn remove(&self, path: &str) -> Option<Marker> {
        self.root.write().remove(&MarkerPath::parse(path))
    }

    /// Deep-merge a batch of markers, e.g. everything a platform announces
    /// when it becomes ready.
    pub fn merge(&self, markers: Marker) {
        self.root.write().merge(markers);
    }

    /// Swap the whole tree.
    pub fn replace(&self, root: Marker) -> Marker {
        std::mem::replace(&mut *self.root.write(), root)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Marker> {
        self.root.read()
    }

    /// Evaluate a latch against the markers as they are right now.
    pub fn satisfies(&self, latch: &LatchExpr) -> bool {
        latch.is_satisfied(&self.read())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("root", &*self.read())
            .finish()
    }
}
