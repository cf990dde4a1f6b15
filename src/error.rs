use crate::registry::CapabilityName;

/// Wiring errors raised while capabilities are being registered.
///
/// Both variants mean the composition root is wrong; callers abort
/// initialization rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("capability '{name}' is already registered")]
    DuplicateRegistration { name: CapabilityName },

    #[error("capability name must not be empty")]
    EmptyName,
}
