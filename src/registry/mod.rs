//! The capability registry and its registration protocol.
//!
//! A `Registry` is the composition root for one initialization phase. Each
//! `register(name).install(latch, capability, fallback)` call records the
//! latch, binds the fallback, and upgrades straight to the capability when the
//! latch already holds; otherwise the capability waits in the pending queue.
//! `finish` closes the phase and hands out the long-lived probe plus, when
//! something is still pending, the one-shot [`ActivationTrigger`].

pub mod binding;
pub mod identity;
pub(crate) mod pending;
pub(crate) mod records;

pub use binding::{Handle, Implementation, noop};
pub use identity::{BindingSide, CapabilityName};

use crate::activation::ActivationTrigger;
use crate::environment::Environment;
use crate::error::RegistryError;
use crate::latch::LatchExpr;
use binding::{BindingCell, BindingStore};
use pending::{PendingActivation, PendingQueue};
use records::ActivationRecords;
use std::sync::Arc;
use tracing::debug;

/// Registration-phase owner of the binding store, the activation records and
/// the pending queue.
pub struct Registry {
    environment: Environment,
    records: ActivationRecords,
    bindings: BindingStore,
    pending: PendingQueue,
}

impl Registry {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            records: ActivationRecords::default(),
            bindings: BindingStore::default(),
            pending: PendingQueue::default(),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Start registering `name`; nothing is recorded until `install`.
    pub fn register(&mut self, name: impl Into<CapabilityName>) -> Registration<'_> {
        Registration {
            registry: self,
            name: name.into(),
        }
    }

    /// Whether the latch recorded for `name` holds right now.
    pub fn probe(&self, name: &str) -> bool {
        probe_latch(&self.records, &self.environment, name)
    }

    pub fn binding_side(&self, name: &str) -> Option<BindingSide> {
        self.bindings.side(name)
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Number of capabilities still bound to their fallback awaiting readiness.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Close the registration phase.
    ///
    /// The trigger is `None` when every latch already held, so there is
    /// nothing to listen for.
    pub fn finish(self) -> Initialized {
        let Registry {
            environment,
            records,
            bindings,
            pending,
        } = self;
        debug!(
            registered = records.len(),
            bound = bindings.len(),
            pending = pending.len(),
            "registration phase finished"
        );
        let trigger = if pending.is_empty() {
            None
        } else {
            Some(ActivationTrigger::new(environment.clone(), pending))
        };
        Initialized {
            probe: CapabilityProbe {
                environment,
                records: Arc::new(records),
                bindings: Arc::new(bindings),
            },
            trigger,
        }
    }
}

/// A capability name awaiting its latch and implementations.
pub struct Registration<'r> {
    registry: &'r mut Registry,
    name: CapabilityName,
}

impl Registration<'_> {
    /// Install the capability and return its stable handle.
    ///
    /// Pass [`noop`] for a side that has nothing to do. A name that is empty
    /// or already registered is rejected and leaves the existing binding
    /// untouched.
    pub fn install<A, R, C, F>(
        self,
        latch: impl Into<LatchExpr>,
        capability: C,
        fallback: F,
    ) -> Result<Handle<A, R>, RegistryError>
    where
        A: 'static,
        R: 'static,
        C: Fn(A) -> R + Send + Sync + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let Registration { registry, name } = self;
        if name.as_str().trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if registry.records.contains(name.as_str()) {
            return Err(RegistryError::DuplicateRegistration { name });
        }

        let latch = latch.into();
        registry.records.insert(name.clone(), latch.clone());

        let cell = Arc::new(BindingCell::new(name.clone(), Arc::new(fallback)));
        let capability: Implementation<A, R> = Arc::new(capability);

        if registry.environment.satisfies(&latch) {
            cell.bind(BindingSide::Capability, capability);
            debug!(capability = %name, latch = %latch, "latch satisfied, bound capability");
        } else {
            let queued_cell = Arc::clone(&cell);
            registry.pending.push(PendingActivation::new(
                name.clone(),
                latch.clone(),
                move || queued_cell.bind(BindingSide::Capability, capability),
            ));
            debug!(capability = %name, latch = %latch, "latch unsatisfied, queued for readiness");
        }

        registry.bindings.insert(name, cell.clone());
        Ok(Handle::new(cell))
    }
}

/// Everything that outlives the registration phase.
pub struct Initialized {
    pub probe: CapabilityProbe,
    pub trigger: Option<ActivationTrigger>,
}

/// Read-only view over the activation records, usable for the rest of the
/// process lifetime.
///
/// Consumers whose capability and fallback behave differently branch on
/// `probe` before calling instead of relying on silent substitution.
#[derive(Clone)]
pub struct CapabilityProbe {
    environment: Environment,
    records: Arc<ActivationRecords>,
    bindings: Arc<BindingStore>,
}

impl CapabilityProbe {
    /// Whether the latch recorded for `name` holds right now, regardless of
    /// what is bound. Unknown names are never satisfied.
    pub fn probe(&self, name: &str) -> bool {
        probe_latch(&self.records, &self.environment, name)
    }

    pub fn latch(&self, name: &str) -> Option<&LatchExpr> {
        self.records.latch(name)
    }

    pub fn binding_side(&self, name: &str) -> Option<BindingSide> {
        self.bindings.side(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &CapabilityName> {
        self.records.names()
    }
}

fn probe_latch(records: &ActivationRecords, environment: &Environment, name: &str) -> bool {
    records
        .latch(name)
        .is_some_and(|latch| environment.satisfies(latch))
}
