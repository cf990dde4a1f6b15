//! Evaluate latch expressions against an environment snapshot.
//!
//! Prints one JSON object per expression (`{"expression", "satisfied",
//! "clauses"}`) so shell scripts can check what a given host snapshot would
//! activate without wiring a registry. `--require` turns any unsatisfied
//! expression into exit status 2.

use anyhow::{Context, Result, bail};
use capgate::{Environment, EnvironmentSnapshot, LatchExpr, default_snapshot_path, logging};
use serde::Serialize;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    logging::init(args.verbose);

    let environment = match args.snapshot_path() {
        Some(path) => {
            let snapshot = match &args.schema {
                Some(schema) => EnvironmentSnapshot::load_with_schema(&path, schema)?,
                None => EnvironmentSnapshot::load(&path)?,
            };
            Environment::from_snapshot(snapshot)
        }
        None => Environment::new(),
    };

    let mut all_satisfied = true;
    for expression in &args.expressions {
        let latch = LatchExpr::parse(expression);
        let satisfied = environment.satisfies(&latch);
        all_satisfied &= satisfied;
        let record = LatchCheck {
            expression,
            satisfied,
            clauses: latch.clauses().iter().map(|clause| clause.to_string()).collect(),
        };
        println!("{}", serde_json::to_string(&record)?);
    }

    if args.require && !all_satisfied {
        std::process::exit(2);
    }
    Ok(())
}

#[derive(Serialize)]
struct LatchCheck<'a> {
    expression: &'a str,
    satisfied: bool,
    clauses: Vec<String>,
}

struct CliArgs {
    env_file: Option<PathBuf>,
    schema: Option<PathBuf>,
    require: bool,
    verbose: bool,
    expressions: Vec<String>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut env_file = None;
        let mut schema = None;
        let mut require = false;
        let mut verbose = false;
        let mut expressions = Vec::new();

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--env" => env_file = Some(PathBuf::from(next_value(&mut args, "--env")?)),
                "--schema" => schema = Some(PathBuf::from(next_value(&mut args, "--schema")?)),
                "--require" => require = true,
                "--verbose" | "-v" => verbose = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                "--" => {
                    for rest in args.by_ref() {
                        expressions.push(
                            rest.into_string()
                                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?,
                        );
                    }
                }
                flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
                _ => expressions.push(arg),
            }
        }

        if expressions.is_empty() {
            print_usage();
            bail!("at least one latch expression is required");
        }

        Ok(Self {
            env_file,
            schema,
            require,
            verbose,
            expressions,
        })
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.env_file.clone().or_else(default_snapshot_path)
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
        "Usage: latch-check [--env FILE] [--schema FILE] [--require] [--verbose] EXPRESSION...\n\n\
         Evaluates each latch expression (comma-separated dot paths) against an\n\
         environment snapshot and prints one JSON line per expression.\n\n\
         Options:\n  \
           --env FILE     Snapshot to evaluate against (default: $CAPGATE_ENV, else empty).\n  \
           --schema FILE  Validate the snapshot with this schema instead of the bundled one.\n  \
           --require      Exit 2 when any expression is unsatisfied.\n  \
           --verbose, -v  Debug logging on stderr (CAPGATE_LOG overrides)."
    );
}
