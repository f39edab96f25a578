//! lanes CLI — driving adapter for the lanes record router.
//!
//! Subcommands:
//! - `check <config>` — validate a selector config
//! - `eval <config> [--id id] [--field /path=json...] [--attr name=value...]` — route one record, with trace
//! - `route <config> <records.jsonl> [--id-field name] [--on-error policy]` — route a JSON-lines file
//! - `info` — list EL functions
//!
//! Logs go to stderr, filtered by `LANES_LOG` (default `warn`).

use std::collections::BTreeMap;
use std::process;

use lanes::el::{ElEvaluator, Function};
use lanes::{
    LanePredicate, OnRecordError, Record, RouteTableBuilder, Router, Value, DEFAULT_PREDICATE,
    EXPRESSION_CLOSE, EXPRESSION_OPEN,
};
use lanes_test::{declared_lanes, FakeHost, TestRecord};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LANES_LOG";

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "eval" => cmd_eval(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "route" => cmd_route(&args[2..]),
        "info" => cmd_info(),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_eval(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("eval requires a config file path".into());
    }

    let config = load_config(&args[0])?;
    let record = parse_record_args(&args[1..])?.build();
    let router = build_router(&config)?;

    let mut ctx = router.context();
    let trace = router
        .route_with_trace(&mut ctx, &record)
        .map_err(|e| e.to_string())?;

    for step in &trace.steps {
        let outcome = if step.matched { "match" } else { "no match" };
        println!("  [{}] {} -> {}: {outcome}", step.index, step.expression, step.lane);
    }
    if trace.used_default {
        println!("{} (default)", trace.lanes.join(", "));
    } else {
        println!("{}", trace.lanes.join(", "));
    }

    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("check requires a config file path".into());
    }

    let config = load_config(&args[0])?;
    let router = build_router(&config)?;

    println!(
        "Config valid: {} predicate(s), default lane \"{}\"",
        router.table().predicates().len(),
        router.table().default_lane()
    );
    Ok(())
}

fn cmd_route(args: &[String]) -> Result<(), String> {
    if args.len() < 2 {
        return Err("route requires a config file path and a records file path".into());
    }

    let config = load_config(&args[0])?;
    let options = parse_route_options(&args[2..])?;
    let content = std::fs::read_to_string(&args[1])
        .map_err(|e| format!("failed to read \"{}\": {e}", args[1]))?;
    let records = parse_records(&content, options.id_field.as_deref())?;
    tracing::debug!(records = records.len(), policy = ?options.on_error, "routing records");
    let router = build_router(&config)?;

    let mut sink = |record: &TestRecord, lane: &str| println!("{lane}\t{}", record.source_id());
    let outcome = router
        .process_batch(&records, &mut sink, options.on_error)
        .map_err(|e| format!("pipeline stopped: {e}"))?;

    for err in &outcome.errors {
        tracing::warn!(
            record = %err.record_id,
            predicate = %err.expression,
            error = %err.source,
            "record rejected"
        );
    }
    eprintln!(
        "{} routed, {} rejected, {} discarded",
        outcome.routed,
        outcome.errors.len(),
        outcome.discarded
    );
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Uniform return type for all commands
fn cmd_info() -> Result<(), String> {
    println!("Expressions: {EXPRESSION_OPEN} ... {EXPRESSION_CLOSE}");
    println!("Default lane predicate: {DEFAULT_PREDICATE}");

    println!("\nFunctions:");
    for function in Function::ALL {
        println!("  {:<40} {}", function.signature(), function.description());
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Router assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

/// Selector config plus the stage's declared lanes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliConfig {
    lane_predicates: Vec<LanePredicate>,
    #[serde(default)]
    constants: BTreeMap<String, Value>,
    /// Declared output lanes; defaults to the distinct configured lanes.
    #[serde(default)]
    output_lanes: Option<Vec<String>>,
}

impl CliConfig {
    fn output_lanes(&self) -> Vec<String> {
        self.output_lanes
            .clone()
            .unwrap_or_else(|| declared_lanes(&self.lane_predicates))
    }
}

fn build_router(config: &CliConfig) -> Result<Router<TestRecord, ElEvaluator>, String> {
    let evaluator = ElEvaluator::new();
    let mut host = FakeHost::new(config.output_lanes());
    let routes = RouteTableBuilder::new(&evaluator)
        .build(&config.lane_predicates, &config.constants, &mut host)
        .map_err(|issues| format!("config invalid: {issues}"))?;
    Ok(Router::new(evaluator, routes))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config and record loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(path: &str) -> Result<CliConfig, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = parse_config(&content, is_json)?;
    tracing::debug!(
        path,
        predicates = config.lane_predicates.len(),
        constants = config.constants.len(),
        "loaded config"
    );
    Ok(config)
}

fn parse_config(content: &str, is_json: bool) -> Result<CliConfig, String> {
    if is_json {
        serde_json::from_str(content).map_err(|e| format!("JSON parse error: {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(content).map_err(|e| format!("YAML parse error: {e}"))
    }
}

/// One JSON object per line. Blank lines are skipped.
///
/// The record id is the `id_field` value when present, else the line number.
fn parse_records(content: &str, id_field: Option<&str>) -> Result<Vec<TestRecord>, String> {
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let data: serde_json::Value =
            serde_json::from_str(line).map_err(|e| format!("line {line_no}: {e}"))?;

        let id = id_field
            .and_then(|field| data.get(field))
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| line_no.to_string());
        records.push(TestRecord::new(id, data));
    }
    Ok(records)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

/// Record described on the command line.
#[derive(Debug, Default)]
struct RecordArgs {
    id: Option<String>,
    fields: Vec<(String, serde_json::Value)>,
    attributes: Vec<(String, String)>,
}

impl RecordArgs {
    fn build(self) -> TestRecord {
        let record = TestRecord::empty(self.id.unwrap_or_else(|| "cli".into()));
        let record = self
            .fields
            .into_iter()
            .fold(record, |record, (path, value)| record.with_field(&path, value));
        self.attributes
            .into_iter()
            .fold(record, |record, (name, value)| record.with_attribute(name, value))
    }
}

fn parse_record_args(args: &[String]) -> Result<RecordArgs, String> {
    let mut record = RecordArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--id" => {
                let id = args
                    .get(i + 1)
                    .ok_or_else(|| "--id requires a value".to_owned())?;
                record.id = Some(id.clone());
                i += 2;
            }
            "--field" => {
                i += 1;
                while i < args.len() && !args[i].starts_with("--") {
                    let pair = &args[i];
                    let (path, raw) = pair.split_once('=').ok_or_else(|| {
                        format!("invalid field \"{pair}\", expected /path=json")
                    })?;
                    // Not JSON: take the text as a string
                    let value = serde_json::from_str(raw)
                        .unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()));
                    record.fields.push((path.to_owned(), value));
                    i += 1;
                }
            }
            "--attr" => {
                i += 1;
                while i < args.len() && !args[i].starts_with("--") {
                    let pair = &args[i];
                    let (name, value) = pair.split_once('=').ok_or_else(|| {
                        format!("invalid attribute \"{pair}\", expected name=value")
                    })?;
                    record.attributes.push((name.to_owned(), value.to_owned()));
                    i += 1;
                }
            }
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
    }

    Ok(record)
}

#[derive(Debug)]
struct RouteOptions {
    id_field: Option<String>,
    on_error: OnRecordError,
}

fn parse_route_options(args: &[String]) -> Result<RouteOptions, String> {
    let mut options = RouteOptions {
        id_field: None,
        on_error: OnRecordError::default(),
    };
    let mut i = 0;

    while i < args.len() {
        let flag = args[i].as_str();
        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--id-field" => options.id_field = Some(value.clone()),
            "--on-error" => options.on_error = parse_policy(value)?,
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
        i += 2;
    }

    Ok(options)
}

fn parse_policy(value: &str) -> Result<OnRecordError, String> {
    match value {
        "discard" => Ok(OnRecordError::Discard),
        "to-error" => Ok(OnRecordError::ToError),
        "stop" => Ok(OnRecordError::StopPipeline),
        other => Err(format!(
            "unknown on-error policy \"{other}\", expected discard, to-error or stop"
        )),
    }
}

fn print_usage() {
    eprintln!(
        "Usage: lanes <command> [options]

Commands:
  check <config>                               Validate config
  eval <config> [--id id] [--field /path=json...] [--attr name=value...]
                                               Route one record and show the trace
  route <config> <records.jsonl> [--id-field name] [--on-error discard|to-error|stop]
                                               Route a JSON-lines file, one lane<TAB>id per delivery
  info                                         List expression functions
  help                                         Show this help

Environment:
  {LOG_ENV}                                    Log filter (default: warn)"
    );
}
