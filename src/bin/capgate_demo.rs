//! Walk a registry through one readiness cycle with simulated consumers.
//!
//! Registers `open`, `generatorOpen`, `getNetworkType`, `isOnline` and
//! `takePhoto` against an initial environment, calls each handle, publishes the "ready" markers,
//! fires the readiness signal, calls the same handles again and finally prints
//! the activation report. Every line on stdout is one JSON object. The
//! consumers only describe what they would do; nothing touches a real
//! platform API.

use anyhow::{Context, Result, bail};
use capgate::{
    ActivationReport, BindingSide, CapabilityProbe, Environment, EnvironmentSnapshot, Handle,
    Initialized, Marker, MarkerPath, Registry, RegistryError, default_snapshot_path, logging,
    readiness,
};
use serde::Serialize;
use serde_json::json;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_TARGET: &str = "_blank";
const BLANK_PAGE: &str = "about:blank";
const IN_APP_BROWSER_DEFAULTS: [(&str, &str); 3] = [
    ("toolbarposition", "top"),
    ("location", "no"),
    ("closebuttoncaption", "Close"),
];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    logging::init(args.verbose);

    let environment = match args.env_file.clone().or_else(default_snapshot_path) {
        Some(path) => Environment::from_snapshot(EnvironmentSnapshot::load(&path)?),
        None => Environment::from_marker(Marker::from(json!({"navigator": {"onLine": true}}))),
    };
    let ready_markers = match &args.ready_env_file {
        Some(path) => EnvironmentSnapshot::load(path)?.markers,
        None => default_ready_markers(),
    };

    let mut registry = Registry::new(environment.clone());
    let consumers = Consumers::register(&mut registry)?;
    let Initialized { probe, trigger } = registry.finish();

    let (signal, listener) = readiness();
    let activation = trigger.map(|trigger| trigger.spawn(listener));

    consumers.exercise("before", &probe, "https://example.com/before.pdf")?;

    if args.skip_ready {
        drop(signal);
    } else {
        environment.merge(ready_markers);
        signal.fire();
    }

    let report = match activation {
        Some(task) => task.await.context("activation task failed")?,
        None => None,
    };

    consumers.exercise("after", &probe, "https://example.com/after.pdf")?;
    let record = ReportRecord {
        phase: "report",
        report,
    };
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

/// Markers a mobile shell publishes once it is ready.
fn default_ready_markers() -> Marker {
    Marker::from(json!({
        "platform": {"shell": {"open": true}, "files": true},
        "navigator": {
            "connection": {"type": "wifi"},
            "camera": {"getPicture": true}
        }
    }))
}

#[derive(Clone, Debug)]
struct OpenArgs {
    url: String,
    target: Option<String>,
    options: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
struct Window {
    via: &'static str,
    url: String,
    target: String,
    options: Option<String>,
    /// Set when an already open window was pointed at `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    opened_as: Option<String>,
}

/// Opens URLs with a target and options fixed up front.
type Opener = Arc<dyn Fn(String) -> Window + Send + Sync>;

#[derive(Clone, Copy, Debug)]
struct PhotoOptions {
    quality: Option<u8>,
}

#[derive(Clone, Debug, Serialize)]
struct PhotoRequest {
    source: &'static str,
    quality: u8,
    correct_orientation: bool,
}

struct Consumers {
    open: Handle<OpenArgs, Window>,
    generator_open: Handle<(Option<String>, Option<String>), Opener>,
    network_type: Handle<(), String>,
    is_online: Handle<(), bool>,
    take_photo: Handle<PhotoOptions, Option<PhotoRequest>>,
}

impl Consumers {
    fn register(registry: &mut Registry) -> Result<Self, RegistryError> {
        let open = registry.register("open").install(
            "platform.shell.open",
            |args: OpenArgs| Window {
                via: "in_app_browser",
                url: args.url,
                target: args.target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
                options: Some(in_app_browser_options(args.options.as_deref())),
                opened_as: None,
            },
            |args: OpenArgs| window(args.url, args.options),
        )?;

        // Native openers defer to `open`; the fallback opens one blank window
        // up front and retargets it on each call.
        let shell_open = open.clone();
        let generator_open = registry.register("generatorOpen").install(
            "platform.shell.open",
            move |(target, options): (Option<String>, Option<String>)| -> Opener {
                let open = shell_open.clone();
                Arc::new(move |url: String| {
                    open.call(OpenArgs {
                        url,
                        target: target.clone(),
                        options: options.clone(),
                    })
                })
            },
            |(_target, options): (Option<String>, Option<String>)| -> Opener {
                let blank = window(BLANK_PAGE.to_string(), options);
                Arc::new(move |url: String| Window {
                    url,
                    opened_as: Some(blank.url.clone()),
                    ..blank.clone()
                })
            },
        )?;

        let env = registry.environment().clone();
        let network_type = registry.register("getNetworkType").install(
            "navigator.connection",
            move |_: ()| {
                env.read()
                    .get(&MarkerPath::parse("navigator.connection.type"))
                    .and_then(Marker::as_text)
                    .unwrap_or("unknown")
                    .to_string()
            },
            |_: ()| "unknown".to_string(),
        )?;

        let network = network_type.clone();
        let env = registry.environment().clone();
        let is_online = registry.register("isOnline").install(
            "navigator.connection",
            move |_: ()| network.call(()) != "none",
            move |_: ()| {
                env.read()
                    .get(&MarkerPath::parse("navigator.onLine"))
                    .is_some_and(Marker::is_truthy)
            },
        )?;

        // Browsers cannot reproduce the camera flow, so the fallback answers
        // `None` and callers are expected to probe first.
        let take_photo = registry.register("takePhoto").install(
            "navigator.camera.getPicture, platform.files",
            |options: PhotoOptions| {
                Some(PhotoRequest {
                    source: "camera",
                    quality: options.quality.unwrap_or(50),
                    correct_orientation: true,
                })
            },
            |_: PhotoOptions| None,
        )?;

        Ok(Self {
            open,
            generator_open,
            network_type,
            is_online,
            take_photo,
        })
    }

    fn exercise(&self, phase: &str, probe: &CapabilityProbe, url: &str) -> Result<()> {
        emit(
            phase,
            probe,
            &self.open,
            OpenArgs {
                url: url.to_string(),
                target: None,
                options: None,
            },
        )?;
        let opener = self.generator_open.call((None, None));
        record(
            phase,
            probe,
            &self.generator_open,
            opener(url.to_string()),
        )?;
        emit(phase, probe, &self.network_type, ())?;
        emit(phase, probe, &self.is_online, ())?;
        emit(
            phase,
            probe,
            &self.take_photo,
            PhotoOptions { quality: Some(80) },
        )?;
        Ok(())
    }
}

fn emit<A, R: Serialize>(
    phase: &str,
    probe: &CapabilityProbe,
    handle: &Handle<A, R>,
    args: A,
) -> Result<()> {
    record(phase, probe, handle, handle.call(args))
}

/// Print the outcome of a call made through `handle`.
fn record<A, R, T: Serialize>(
    phase: &str,
    probe: &CapabilityProbe,
    handle: &Handle<A, R>,
    result: T,
) -> Result<()> {
    let name = handle.name().as_str();
    let record = CallRecord {
        phase,
        capability: name,
        probe: probe.probe(name),
        side: handle.side(),
        result,
    };
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

/// Browsers always get a fresh window.
fn window(url: String, options: Option<String>) -> Window {
    Window {
        via: "window",
        url,
        target: DEFAULT_TARGET.to_string(),
        options,
        opened_as: None,
    }
}

#[derive(Serialize)]
struct ReportRecord {
    phase: &'static str,
    report: Option<ActivationReport>,
}

#[derive(Serialize)]
struct CallRecord<'a, R> {
    phase: &'a str,
    capability: &'a str,
    probe: bool,
    side: BindingSide,
    result: R,
}

/// Fill in the in-app browser options the caller left out.
fn in_app_browser_options(options: Option<&str>) -> String {
    let given = options.map(str::trim).unwrap_or_default();
    let mut parts: Vec<String> = given
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    for (key, value) in IN_APP_BROWSER_DEFAULTS {
        let prefix = format!("{key}=");
        if !parts.iter().any(|part| part.starts_with(&prefix)) {
            parts.push(format!("{key}={value}"));
        }
    }
    parts.join(",")
}

struct CliArgs {
    env_file: Option<PathBuf>,
    ready_env_file: Option<PathBuf>,
    skip_ready: bool,
    verbose: bool,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut parsed = CliArgs {
            env_file: None,
            ready_env_file: None,
            skip_ready: false,
            verbose: false,
        };

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--env" => parsed.env_file = Some(PathBuf::from(next_value(&mut args, "--env")?)),
                "--ready-env" => {
                    parsed.ready_env_file =
                        Some(PathBuf::from(next_value(&mut args, "--ready-env")?))
                }
                "--skip-ready" => parsed.skip_ready = true,
                "--verbose" | "-v" => parsed.verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => bail!("unknown argument: {other}"),
            }
        }
        Ok(parsed)
    }
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("missing value for {flag}"))?
        .into_string()
        .map_err(|_| anyhow::anyhow!("value for {flag} is not valid UTF-8"))
}

fn print_usage() {
    eprintln!(
        "Usage: capgate-demo [--env FILE] [--ready-env FILE] [--skip-ready] [--verbose]\n\n\
         Options:\n  \
           --env FILE        Initial snapshot (default: $CAPGATE_ENV, else a bare browser).\n  \
           --ready-env FILE  Markers published at readiness (default: a mobile shell).\n  \
           --skip-ready      Drop the readiness signal instead of firing it.\n  \
           --verbose, -v     Debug logging on stderr (CAPGATE_LOG overrides)."
    );
}
