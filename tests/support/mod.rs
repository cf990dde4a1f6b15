#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

pub fn helper_binary(name: &str) -> PathBuf {
    let path = match name {
        "capgate-demo" => env!("CARGO_BIN_EXE_capgate-demo"),
        "latch-check" => env!("CARGO_BIN_EXE_latch-check"),
        other => panic!("unknown helper binary {other}"),
    };
    PathBuf::from(path)
}

/// Command for a helper with inherited capgate variables cleared.
pub fn helper_command(name: &str) -> Command {
    let mut cmd = Command::new(helper_binary(name));
    cmd.env_remove("CAPGATE_ENV").env_remove("CAPGATE_LOG");
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Write a snapshot file wrapping `markers`.
pub fn snapshot_file(markers: Value) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("failed to allocate snapshot file")?;
    serde_json::to_writer(
        &mut file,
        &json!({"schema_version": "capgate_env_v1", "markers": markers}),
    )?;
    file.flush()?;
    Ok(file)
}

/// Parse NDJSON stdout into values.
pub fn json_lines(stdout: &[u8]) -> Result<Vec<Value>> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("line {} is not JSON", idx + 1))
        })
        .collect()
}

/// The record for `capability` emitted during `phase`.
pub fn call_record<'a>(records: &'a [Value], phase: &str, capability: &str) -> &'a Value {
    records
        .iter()
        .find(|record| {
            record.get("phase").and_then(Value::as_str) == Some(phase)
                && record.get("capability").and_then(Value::as_str) == Some(capability)
        })
        .unwrap_or_else(|| panic!("no {phase} record for {capability}"))
}
