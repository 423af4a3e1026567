//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a monotonic sequence number, a level and a
//! domain. Records go to `<LOG_DIR>/<RUN_ID>/events.jsonl` (info and above) or
//! `trace.jsonl` (trace/debug) and are echoed to stderr so the terminal screen
//! on stdout stays clean.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Level::parse(&v.to_lowercase()))
            .unwrap_or(Level::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Ingest,  // Fetch, table parsing, row validation
    Sample,  // Bloodiness ordering and stride sampling
    Session, // Selection and animation transitions
    Layout,  // Glyph placement
    System,  // Startup, shutdown
    Profile, // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Ingest => "ingest",
            Domain::Sample => "sample",
            Domain::Session => "session",
            Domain::Layout => "layout",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    /// `LOG_DOMAINS` is a comma-separated allow list, or "all".
    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn open_sink(path: PathBuf) -> Option<Mutex<BufWriter<File>>> {
    match File::create(&path) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", path.display(), err);
            None
        }
    }
}

fn write_run_manifest(run_dir: &Path, run_id: &str) -> std::io::Result<()> {
    std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        })
        .to_string(),
    )
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }

        if let Err(err) = write_run_manifest(&run_dir, &run_id) {
            eprintln!("[log] failed to write run manifest: {}", err);
        }

        RunContext {
            events: open_sink(run_dir.join("events.jsonl")),
            trace: open_sink(run_dir.join("trace.jsonl")),
            run_id,
        }
    })
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(Ok(mut w)) = writer.as_ref().map(|m| m.lock()) {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let ctx = ensure_run_context();
    let line = Value::Object(record(&ctx.run_id, level, domain, event, fields)).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    eprintln!("{}", line);
}

fn record(
    run_id: &str,
    level: Level,
    domain: Domain,
    event: &str,
    mut fields: Map<String, Value>,
) -> Map<String, Value> {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    entry
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_startup(source: &str, sample_size: usize, seeded: bool) {
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("source", v_str(source)),
            ("sample_size", json!(sample_size)),
            ("seeded", json!(seeded)),
        ]),
    );
}

pub fn log_row_rejected(line: usize, reason: &str, detail: &str) {
    log(
        Level::Trace,
        Domain::Ingest,
        "row_rejected",
        obj(&[
            ("row", json!(line)),
            ("reason", v_str(reason)),
            ("detail", v_str(detail)),
        ]),
    );
}

pub fn log_ingest_summary(rows_read: usize, accepted: usize, rejected: usize, fingerprint: &str) {
    log(
        Level::Info,
        Domain::Ingest,
        "ingest_summary",
        obj(&[
            ("rows_read", json!(rows_read)),
            ("accepted", json!(accepted)),
            ("rejected", json!(rejected)),
            ("sha256", v_str(fingerprint)),
        ]),
    );
}

pub fn log_sample(population: usize, step: usize, picked: &[String]) {
    log(
        Level::Debug,
        Domain::Sample,
        "stride_sample",
        obj(&[
            ("population", json!(population)),
            ("step", json!(step)),
            ("picked", Value::Array(picked.iter().map(|s| v_str(s)).collect())),
        ]),
    );
}

pub fn log_fallback(error: &str) {
    log(
        Level::Warn,
        Domain::Ingest,
        "fallback_dataset",
        obj(&[("msg", v_str("using built-in conflicts")), ("error", v_str(error))]),
    );
}

pub fn log_transition(event: &str, from: &str, to: &str, selected: Option<&str>, armed: bool) {
    log(
        Level::Debug,
        Domain::Session,
        event,
        obj(&[
            ("from", v_str(from)),
            ("to", v_str(to)),
            ("selected", selected.map(v_str).unwrap_or(Value::Null)),
            ("animation_armed", json!(armed)),
        ]),
    );
}

pub fn log_rejected_transition(event: &str, error: &str) {
    log(
        Level::Warn,
        Domain::Session,
        "transition_rejected",
        obj(&[("event", v_str(event)), ("error", v_str(error))]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits elapsed milliseconds at trace level when dropped.
pub struct ProfileScope {
    label: &'static str,
    context: Map<String, Value>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self::with_context(label, &[])
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: obj(fields),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = std::mem::take(&mut self.context);
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}
