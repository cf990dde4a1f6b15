use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

/// Stable key for one registrable function (`open`, `download`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(pub String);

impl CapabilityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        CapabilityName(value.to_string())
    }
}

impl From<String> for CapabilityName {
    fn from(value: String) -> Self {
        CapabilityName(value)
    }
}

impl Borrow<str> for CapabilityName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Which implementation a binding currently points at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingSide {
    Fallback,
    Capability,
}

impl BindingSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingSide::Fallback => "fallback",
            BindingSide::Capability => "capability",
        }
    }
}

impl Serialize for BindingSide {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BindingSide {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "fallback" => Ok(BindingSide::Fallback),
            "capability" => Ok(BindingSide::Capability),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["fallback", "capability"],
            )),
        }
    }
}
