//! Capability-gated function registry.
//!
//! Callers invoke a stable handle (`open`, `download`) while the registry
//! decides, per capability, whether the native implementation or a generic
//! fallback is bound. The decision is driven by latch expressions evaluated
//! against a host-owned marker tree. Capabilities whose markers are missing at
//! registration run on their fallback until a one-shot readiness signal lets
//! the [`ActivationTrigger`] upgrade them; handles already held by callers
//! follow the upgrade without being re-acquired.
//!
//! Typical wiring:
//!
//! ```text
//! let env = Environment::new();
//! let mut registry = Registry::new(env.clone());
//! let open = registry.register("open").install("platform.shell.open", native, fallback)?;
//! let Initialized { probe, trigger } = registry.finish();
//! let (signal, listener) = readiness();
//! if let Some(trigger) = trigger { trigger.spawn(listener); }
//! // host publishes markers, then: signal.fire();
//! ```

pub mod activation;
pub mod environment;
pub mod error;
pub mod latch;
pub mod logging;
pub mod registry;
mod schema_loader;

pub use activation::{
    ActivationReport, ActivationTrigger, ReadinessListener, ReadinessSignal, readiness,
};
pub use environment::{
    Environment, EnvironmentSnapshot, Marker, MarkerPath, SNAPSHOT_SCHEMA_VERSION,
    default_snapshot_path,
};
pub use error::RegistryError;
pub use latch::{LatchExpr, satisfied};
pub use registry::{
    BindingSide, CapabilityName, CapabilityProbe, Handle, Implementation, Initialized,
    Registration, Registry, noop,
};
