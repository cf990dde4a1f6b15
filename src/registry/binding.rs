//! Indirection cells and the handles that resolve through them.
//!
//! Every registered capability owns one `BindingCell`. Handles hold the cell,
//! never the implementation, and load the active implementation on each call,
//! so a rebinding is visible through every handle already given out.

use crate::registry::identity::{BindingSide, CapabilityName};
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased-by-signature implementation of a capability.
pub type Implementation<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// The default implementation for a side that has nothing to do.
pub fn noop<A, R>() -> impl Fn(A) -> R + Send + Sync + 'static
where
    A: 'static,
    R: Default + 'static,
{
    |_| R::default()
}

struct Bound<A, R> {
    side: BindingSide,
    implementation: Implementation<A, R>,
}

pub(crate) struct BindingCell<A, R> {
    name: CapabilityName,
    active: ArcSwap<Bound<A, R>>,
}

impl<A, R> BindingCell<A, R> {
    /// A cell starts out on its fallback.
    pub(crate) fn new(name: CapabilityName, fallback: Implementation<A, R>) -> Self {
        Self {
            name,
            active: ArcSwap::from_pointee(Bound {
                side: BindingSide::Fallback,
                implementation: fallback,
            }),
        }
    }

    pub(crate) fn bind(&self, side: BindingSide, implementation: Implementation<A, R>) {
        self.active.store(Arc::new(Bound {
            side,
            implementation,
        }));
    }

    fn current(&self) -> Implementation<A, R> {
        Arc::clone(&self.active.load().implementation)
    }
}

/// What the binding store needs from a cell regardless of its signature.
pub(crate) trait BindingSlot: Send + Sync {
    fn side(&self) -> BindingSide;
}

impl<A: 'static, R: 'static> BindingSlot for BindingCell<A, R> {
    fn side(&self) -> BindingSide {
        self.active.load().side
    }
}

/// Capability name to its binding cell.
#[derive(Default)]
pub(crate) struct BindingStore {
    cells: BTreeMap<CapabilityName, Arc<dyn BindingSlot>>,
}

impl BindingStore {
    pub(crate) fn insert(&mut self, name: CapabilityName, cell: Arc<dyn BindingSlot>) {
        self.cells.insert(name, cell);
    }

    pub(crate) fn side(&self, name: &str) -> Option<BindingSide> {
        self.cells.get(name).map(|cell| cell.side())
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

/// Stable handle returned at registration.
///
/// Cloning shares the same cell. `call` forwards its argument and return
/// value untouched, so `Result`s and futures produced by an implementation
/// reach the caller as-is. Functions of several arguments take a tuple.
pub struct Handle<A, R> {
    cell: Arc<BindingCell<A, R>>,
}

impl<A, R> Handle<A, R> {
    pub(crate) fn new(cell: Arc<BindingCell<A, R>>) -> Self {
        Self { cell }
    }

    /// Invoke whatever implementation is bound right now.
    pub fn call(&self, args: A) -> R {
        // Clone out of the cell so a rebinding during a long call (or a
        // handle calling another handle) never holds a guard.
        let implementation = self.cell.current();
        implementation(args)
    }

    pub fn name(&self) -> &CapabilityName {
        &self.cell.name
    }

    pub fn side(&self) -> BindingSide {
        self.cell.active.load().side
    }

    /// True when both handles resolve through the same binding.
    pub fn same_binding(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<A, R> Clone for Handle<A, R> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<A, R> fmt::Debug for Handle<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.cell.name)
            .field("side", &self.side())
            .finish()
    }
}
