//! On-disk snapshots of a marker tree.
//!
//! Snapshots let the binaries and tests describe what a host platform exposes
//! before and after it becomes ready. Every snapshot is validated against
//! `schema/environment_snapshot.schema.json` before it is deserialized, so a
//! typo in `schema_version` or a stray top-level key fails loudly instead of
//! producing an empty environment.

use crate::environment::Marker;
use crate::schema_loader::{SchemaLoadOptions, SchemaLoadResult, compile_schema, load_json_schema};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SNAPSHOT_SCHEMA_VERSION: &str = "capgate_env_v1";

/// Names a default snapshot for the binaries when no `--env` flag is given.
pub const SNAPSHOT_ENV_VAR: &str = "CAPGATE_ENV";

const EMBEDDED_SCHEMA: &str = include_str!("../../schema/environment_snapshot.schema.json");
const EMBEDDED_SCHEMA_LABEL: &str = "schema/environment_snapshot.schema.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub markers: Marker,
}

impl EnvironmentSnapshot {
    /// Wrap an in-memory marker tree.
    pub fn new(markers: Marker) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            description: None,
            markers,
        }
    }

    /// Load and validate a snapshot against the bundled schema.
    pub fn load(path: &Path) -> Result<Self> {
        let schema = embedded_schema()?;
        Self::load_validated(path, &schema)
    }

    /// Load a snapshot, validating it against a schema file on disk instead of
    /// the bundled copy.
    pub fn load_with_schema(path: &Path, schema_path: &Path) -> Result<Self> {
        let schema = load_json_schema(
            schema_path,
            SchemaLoadOptions {
                expected_version: Some(SNAPSHOT_SCHEMA_VERSION),
                patch_schema_version_const: true,
                ..Default::default()
            },
        )
        .with_context(|| format!("loading snapshot schema {}", schema_path.display()))?;
        debug!(
            schema = %schema_path.display(),
            schema_version = %schema.schema_version,
            "using external snapshot schema"
        );
        Self::load_validated(path, &schema)
    }

    /// Validate and convert an already-parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let schema = embedded_schema()?;
        schema.validate("environment snapshot", &value)?;
        serde_json::from_value(value).context("decoding environment snapshot")
    }

    fn load_validated(path: &Path, schema: &SchemaLoadResult) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening snapshot {}", path.display()))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        schema.validate(&format!("snapshot {}", path.display()), &value)?;
        serde_json::from_value(value)
            .with_context(|| format!("decoding snapshot {}", path.display()))
    }
}

/// Snapshot path named by `CAPGATE_ENV`, when set and non-empty.
pub fn default_snapshot_path() -> Option<PathBuf> {
    env::var_os(SNAPSHOT_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn embedded_schema() -> Result<SchemaLoadResult> {
    let schema: Value =
        serde_json::from_str(EMBEDDED_SCHEMA).context("parsing bundled snapshot schema")?;
    compile_schema(EMBEDDED_SCHEMA_LABEL, schema, SchemaLoadOptions::default())
}
