//! JSON Schema compilation shared by the snapshot loaders.
//!
//! Callers hand in the schema payload (embedded or read from disk); the loader
//! extracts and checks its `schema_version` const, optionally patches it to a
//! caller-supplied version, and compiles a validator. Validation failures are
//! flattened into one message per violation so CLI output stays readable.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs::File;
use std::path::Path;

/// Result of loading and compiling a JSON Schema.
pub(crate) struct SchemaLoadResult {
    pub schema_version: String,
    pub compiled: JSONSchema,
}

/// Controls how schemas are normalized before compilation.
pub(crate) struct SchemaLoadOptions<'a> {
    /// Where to find the schema_version const inside the schema payload.
    pub schema_version_pointer: &'a str,
    /// Override schema_version when provided (used to align consts).
    pub expected_version: Option<&'a str>,
    /// Patch the schema_version const in the schema payload to match
    /// `expected_version`.
    pub patch_schema_version_const: bool,
}

impl<'a> Default for SchemaLoadOptions<'a> {
    fn default() -> Self {
        Self {
            schema_version_pointer: "/properties/schema_version/const",
            expected_version: None,
            patch_schema_version_const: false,
        }
    }
}

/// Read a schema from disk and compile it.
pub(crate) fn load_json_schema(
    path: &Path,
    options: SchemaLoadOptions<'_>,
) -> Result<SchemaLoadResult> {
    let schema: Value = serde_json::from_reader(
        File::open(path).with_context(|| format!("opening schema {}", path.display()))?,
    )
    .with_context(|| format!("parsing schema {}", path.display()))?;
    compile_schema(&path.display().to_string(), schema, options)
}

/// Compile an in-memory schema; `label` names it in error messages.
pub(crate) fn compile_schema(
    label: &str,
    mut schema: Value,
    options: SchemaLoadOptions<'_>,
) -> Result<SchemaLoadResult> {
    let schema_version = match options.expected_version {
        Some(version) => version.to_string(),
        None => extract_schema_version(&schema, options.schema_version_pointer)
            .ok_or_else(|| anyhow!("schema {label} missing schema_version const"))?,
    };

    if options.patch_schema_version_const {
        let target = schema
            .pointer_mut(options.schema_version_pointer)
            .ok_or_else(|| {
                anyhow!(
                    "schema {label} missing pointer {} for schema_version const",
                    options.schema_version_pointer
                )
            })?;
        *target = Value::String(schema_version.clone());
    }

    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling schema {label}: {err}"))?;

    Ok(SchemaLoadResult {
        schema_version,
        compiled,
    })
}

impl SchemaLoadResult {
    /// Validate `instance`, joining every violation into the error message.
    pub(crate) fn validate(&self, label: &str, instance: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(instance) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            bail!("{label} failed schema validation:\n{details}");
        }
        Ok(())
    }
}

fn extract_schema_version(schema: &Value, pointer: &str) -> Option<String> {
    let version = schema.pointer(pointer).and_then(Value::as_str)?;
    if version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Some(version.to_string())
    } else {
        None
    }
}
