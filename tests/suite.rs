// Integration suite for the registry: registration protocol, one-shot
// activation, probing, and the two helper binaries.
mod support;

use anyhow::Result;
use capgate::{
    ActivationReport, BindingSide, CapabilityName, Environment, Initialized, LatchExpr, Marker,
    Registry, RegistryError, noop, readiness, satisfied,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use support::{call_record, helper_command, json_lines, run_command, snapshot_file};

fn names(raw: &[&str]) -> Vec<CapabilityName> {
    raw.iter().map(|name| CapabilityName::from(*name)).collect()
}

// Register `open` before the shell is ready, call it, publish the marker, fire
// readiness, and call the very same handle again.
#[tokio::test]
async fn open_switches_to_shell_after_readiness() -> Result<()> {
    let env = Environment::new();
    let mut registry = Registry::new(env.clone());
    let calls: Arc<Mutex<Vec<String>>> = Arc::default();

    let shell_calls = Arc::clone(&calls);
    let window_calls = Arc::clone(&calls);
    let open = registry.register("open").install(
        "platform.shell.open",
        move |url: String| {
            shell_calls.lock().unwrap().push(format!("shell:{url}"));
            "shell"
        },
        move |url: String| {
            window_calls.lock().unwrap().push(format!("window:{url}"));
            "window"
        },
    )?;
    let held = open.clone();

    let Initialized { probe, trigger } = registry.finish();
    let (signal, listener) = readiness();
    let activation = trigger.expect("open is pending").spawn(listener);

    assert_eq!(held.call("https://first.example".into()), "window");
    assert!(!probe.probe("open"));

    env.set("platform.shell.open", true);
    assert!(probe.probe("open"));
    assert_eq!(probe.binding_side("open"), Some(BindingSide::Fallback));
    signal.fire();
    let report = activation.await?.expect("signal fired");

    assert_eq!(report.activated, names(&["open"]));
    assert!(report.fallback.is_empty());
    assert_eq!(held.call("https://second.example".into()), "shell");
    assert!(held.same_binding(&open));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "window:https://first.example".to_string(),
            "shell:https://second.example".to_string()
        ]
    );
    Ok(())
}

#[test]
fn duplicate_registration_fails_without_touching_first_binding() -> Result<()> {
    let env = Environment::new();
    env.set("navigator.camera.getPicture", true);
    let mut registry = Registry::new(env);

    let take_photo = registry.register("takePhoto").install(
        "navigator.camera.getPicture",
        |_: ()| "camera",
        |_: ()| "unsupported",
    )?;
    let second = registry.register("takePhoto").install(
        "navigator.camera.getPicture",
        |_: ()| "album",
        |_: ()| "unsupported",
    );

    assert!(matches!(
        second,
        Err(RegistryError::DuplicateRegistration { ref name }) if name.as_str() == "takePhoto"
    ));
    assert_eq!(take_photo.call(()), "camera");
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[test]
fn latch_clauses_combine_with_and() {
    let environments = [
        json!({}),
        json!({"a": {"b": true}}),
        json!({"c": {"d": 1}}),
        json!({"a": {"b": true}, "c": {"d": 1}}),
        json!({"a": {"b": 0}, "c": {"d": "x"}}),
    ];
    for raw in environments {
        let root = Marker::from(raw.clone());
        assert!(satisfied("", &root), "{raw}");
        assert_eq!(
            satisfied("a.b, c.d", &root),
            satisfied("a.b", &root) && satisfied("c.d", &root),
            "{raw}"
        );
        if root.child("a").is_none() {
            assert!(!satisfied("a.b.c", &root), "{raw}");
        }
    }
}

#[test]
fn flush_with_latch_still_unsatisfied_keeps_fallback_for_good() -> Result<()> {
    let env = Environment::new();
    let mut registry = Registry::new(env.clone());
    let activations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&activations);

    let download = registry.register("download").install(
        "FileTransfer",
        move |_: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            "transfer"
        },
        |_: ()| "system-browser",
    )?;

    let trigger = registry.finish().trigger.expect("download is pending");
    let report = trigger.flush();
    assert_eq!(
        report,
        ActivationReport {
            activated: Vec::new(),
            fallback: names(&["download"]),
        }
    );

    env.set("FileTransfer", true);
    assert_eq!(download.call(()), "system-browser");
    assert_eq!(download.side(), BindingSide::Fallback);
    assert_eq!(activations.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn no_trigger_when_every_latch_holds() -> Result<()> {
    let env = Environment::from_marker(Marker::from(json!({
        "navigator": {"connection": {"type": "4g"}},
        "FileTransfer": {}
    })));
    let mut registry = Registry::new(env);
    let network = registry.register("getNetworkType").install(
        "navigator.connection",
        |_: ()| "4g",
        |_: ()| "unknown",
    )?;
    let _download = registry
        .register("download")
        .install("FileTransfer", noop::<(), ()>(), noop::<(), ()>())?;

    let Initialized { probe, trigger } = registry.finish();
    assert!(trigger.is_none());
    assert_eq!(network.call(()), "4g");
    let registered: Vec<_> = probe.names().map(CapabilityName::as_str).collect();
    assert_eq!(registered, vec!["download", "getNetworkType"]);
    Ok(())
}

#[test]
fn probe_is_false_for_unknown_names_and_reflects_live_latch() -> Result<()> {
    let env = Environment::new();
    let mut registry = Registry::new(env.clone());
    let _open_pdf = registry.register("openPdf").install(
        "cordova.plugins.fileOpener2.open, FileTransfer",
        noop::<String, ()>(),
        noop::<String, ()>(),
    )?;
    let Initialized { probe, trigger } = registry.finish();

    assert!(!probe.probe("installApk"));
    env.set("cordova.plugins.fileOpener2.open", true);
    assert!(!probe.probe("openPdf"));
    env.set("FileTransfer", true);
    assert!(probe.probe("openPdf"));
    assert_eq!(probe.binding_side("openPdf"), Some(BindingSide::Fallback));
    assert_eq!(
        probe.latch("openPdf").map(LatchExpr::clauses).map(<[_]>::len),
        Some(2)
    );

    let report = trigger.expect("pending").flush();
    assert_eq!(report.activated, names(&["openPdf"]));
    assert_eq!(probe.binding_side("openPdf"), Some(BindingSide::Capability));
    Ok(())
}

#[tokio::test]
async fn handles_work_from_other_threads_after_activation() -> Result<()> {
    let env = Environment::new();
    let mut registry = Registry::new(env.clone());
    let is_online = registry
        .register("isOnline")
        .install("navigator.connection", |_: ()| true, |_: ()| false)?;
    let trigger = registry.finish().trigger.expect("pending");
    let (signal, listener) = readiness();
    let task = trigger.spawn(listener);

    env.set("navigator.connection.type", "wifi");
    signal.fire();
    task.await?;

    let worker = is_online.clone();
    let from_thread = std::thread::spawn(move || worker.call(()))
        .join()
        .expect("worker thread");
    assert!(from_thread);
    Ok(())
}

#[test]
fn latch_check_reports_each_expression() -> Result<()> {
    let snapshot = snapshot_file(json!({
        "cordova": {"InAppBrowser": {"open": true}},
        "navigator": {"connection": null}
    }))?;
    let mut cmd = helper_command("latch-check");
    cmd.arg("--env")
        .arg(snapshot.path())
        .arg("cordova.InAppBrowser.open")
        .arg("navigator.connection.type")
        .arg("cordova.InAppBrowser.open, FileTransfer")
        .arg("");
    let output = run_command(cmd)?;
    let records = json_lines(&output.stdout)?;

    let verdicts: Vec<_> = records
        .iter()
        .map(|record| record.get("satisfied").and_then(Value::as_bool))
        .collect();
    assert_eq!(
        verdicts,
        vec![Some(true), Some(false), Some(false), Some(true)]
    );
    assert_eq!(
        records[2].get("clauses"),
        Some(&json!(["cordova.InAppBrowser.open", "FileTransfer"]))
    );
    Ok(())
}

#[test]
fn latch_check_require_exits_two_when_unsatisfied() -> Result<()> {
    let snapshot = snapshot_file(json!({"FileTransfer": true}))?;
    let mut cmd = helper_command("latch-check");
    cmd.arg("--require")
        .arg("--env")
        .arg(snapshot.path())
        .arg("FileTransfer")
        .arg("resolveLocalFileSystemURL");
    let output = cmd.output()?;
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(json_lines(&output.stdout)?.len(), 2);
    Ok(())
}

#[test]
fn latch_check_rejects_invalid_snapshot() -> Result<()> {
    let mut bad = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(&mut bad, br#"{"schema_version": "capgate_env_v1"}"#)?;
    let mut cmd = helper_command("latch-check");
    cmd.arg("--env").arg(bad.path()).arg("FileTransfer");
    let output = cmd.output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed schema validation"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}

#[test]
fn latch_check_reads_default_snapshot_from_env_var() -> Result<()> {
    let snapshot = snapshot_file(json!({"resolveLocalFileSystemURL": true}))?;
    let mut cmd = helper_command("latch-check");
    cmd.env("CAPGATE_ENV", snapshot.path())
        .arg("resolveLocalFileSystemURL");
    let output = run_command(cmd)?;
    let records = json_lines(&output.stdout)?;
    assert_eq!(records[0].get("satisfied"), Some(&json!(true)));
    Ok(())
}

#[test]
fn demo_upgrades_every_capability_after_readiness() -> Result<()> {
    let output = run_command(helper_command("capgate-demo"))?;
    let records = json_lines(&output.stdout)?;

    let before = call_record(&records, "before", "open");
    assert_eq!(before.pointer("/side"), Some(&json!("fallback")));
    assert_eq!(before.pointer("/result/via"), Some(&json!("window")));
    assert_eq!(
        before.pointer("/result/url"),
        Some(&json!("https://example.com/before.pdf"))
    );

    let after = call_record(&records, "after", "open");
    assert_eq!(after.pointer("/side"), Some(&json!("capability")));
    assert_eq!(after.pointer("/result/via"), Some(&json!("in_app_browser")));
    assert_eq!(
        after.pointer("/result/options"),
        Some(&json!(
            "toolbarposition=top,location=no,closebuttoncaption=Close"
        ))
    );

    let generator_before = call_record(&records, "before", "generatorOpen");
    assert_eq!(generator_before.pointer("/side"), Some(&json!("fallback")));
    assert_eq!(generator_before.pointer("/probe"), Some(&json!(false)));
    assert_eq!(
        generator_before.pointer("/result/via"),
        Some(&json!("window"))
    );
    assert_eq!(
        generator_before.pointer("/result/opened_as"),
        Some(&json!("about:blank"))
    );
    assert_eq!(
        generator_before.pointer("/result/url"),
        Some(&json!("https://example.com/before.pdf"))
    );

    let generator_after = call_record(&records, "after", "generatorOpen");
    assert_eq!(generator_after.pointer("/side"), Some(&json!("capability")));
    assert_eq!(
        generator_after.pointer("/result/via"),
        Some(&json!("in_app_browser"))
    );
    assert_eq!(generator_after.pointer("/result/opened_as"), None);
    assert_eq!(
        generator_after.pointer("/result/url"),
        Some(&json!("https://example.com/after.pdf"))
    );

    assert_eq!(
        call_record(&records, "before", "isOnline").get("result"),
        Some(&json!(true))
    );
    assert_eq!(
        call_record(&records, "after", "getNetworkType").get("result"),
        Some(&json!("wifi"))
    );
    assert_eq!(
        call_record(&records, "before", "takePhoto").get("result"),
        Some(&Value::Null)
    );
    assert_eq!(
        call_record(&records, "after", "takePhoto").pointer("/result/quality"),
        Some(&json!(80))
    );

    let report = records.last().expect("report line");
    assert_eq!(report.get("phase"), Some(&json!("report")));
    assert_eq!(
        report.pointer("/report/activated"),
        Some(&json!([
            "open",
            "generatorOpen",
            "getNetworkType",
            "isOnline",
            "takePhoto"
        ]))
    );
    Ok(())
}

#[test]
fn demo_keeps_fallbacks_when_readiness_never_fires() -> Result<()> {
    let mut cmd = helper_command("capgate-demo");
    cmd.arg("--skip-ready");
    let output = run_command(cmd)?;
    let records = json_lines(&output.stdout)?;

    let after = call_record(&records, "after", "open");
    assert_eq!(after.pointer("/result/via"), Some(&json!("window")));
    let report = records.last().expect("report line");
    assert_eq!(report.get("report"), Some(&Value::Null));
    Ok(())
}

#[test]
fn demo_partial_readiness_activates_only_satisfied_latches() -> Result<()> {
    let initial = snapshot_file(json!({"navigator": {"onLine": false}}))?;
    let ready = snapshot_file(json!({
        "platform": {"shell": {"open": true}},
        "navigator": {"camera": {"getPicture": true}}
    }))?;
    let mut cmd = helper_command("capgate-demo");
    cmd.arg("--env")
        .arg(initial.path())
        .arg("--ready-env")
        .arg(ready.path());
    let output = run_command(cmd)?;
    let records = json_lines(&output.stdout)?;

    let report = records.last().expect("report line");
    assert_eq!(
        report.pointer("/report/activated"),
        Some(&json!(["open", "generatorOpen"]))
    );
    assert_eq!(
        report.pointer("/report/fallback"),
        Some(&json!(["getNetworkType", "isOnline", "takePhoto"]))
    );
    assert_eq!(
        call_record(&records, "after", "isOnline").get("result"),
        Some(&json!(false))
    );
    // takePhoto needs both clauses; platform.files never appeared.
    let photo = call_record(&records, "after", "takePhoto");
    assert_eq!(photo.get("probe"), Some(&json!(false)));
    assert_eq!(photo.get("result"), Some(&Value::Null));
    Ok(())
}

#[test]
fn latch_check_without_expressions_is_a_usage_error() -> Result<()> {
    let output = helper_command("latch-check").output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("at least one latch expression is required"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}
