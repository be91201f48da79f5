//! Per-vector results and the run summary
//!
//! Non-finite readings (`-inf` for silence) serialize as JSON `null`.

use crate::harness::compare::ComparisonMismatch;
use crate::meter::{MetricKind, ProcessingError, QueryError, SetupError};
use crate::{EXIT_FAILURE, EXIT_SUCCESS, VERSION};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

/// A single metric reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Which metric was read
    pub metric: MetricKind,
    /// Value in the metric's unit
    pub value: f64,
}

/// Why a vector did not pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Failure {
    /// The library refused a configuration that should work
    Setup(SetupError),
    /// The library accepted a configuration it should refuse
    UnexpectedSetup,
    /// Feeding frames failed
    Processing(ProcessingError),
    /// Reading a metric failed
    Query(QueryError),
    /// A known-answer check missed
    Mismatch(ComparisonMismatch),
    /// A reading disagrees with the same reading of another vector or backend
    Inconsistent {
        reference: String,
        mismatch: ComparisonMismatch,
    },
    /// The reading to compare against does not exist
    MissingReference(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Setup(e) => write!(f, "setup failed: {}", e),
            Failure::UnexpectedSetup => write!(f, "expected setup error, meter was created"),
            Failure::Processing(e) => write!(f, "processing failed: {}", e),
            Failure::Query(e) => write!(f, "query failed: {}", e),
            Failure::Mismatch(m) => write!(f, "{}", m),
            Failure::Inconsistent {
                reference,
                mismatch,
            } => write!(f, "differs from {}: {}", reference, mismatch),
            Failure::MissingReference(name) => write!(f, "no reference reading from {}", name),
        }
    }
}

/// Outcome of one vector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "failures", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Vec<Failure>),
}

impl Verdict {
    /// `Pass` when there are no failures
    pub fn from_failures(failures: Vec<Failure>) -> Self {
        if failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(failures)
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// What one vector measured and whether it passed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Vector name
    pub name: String,
    /// Every reading taken, in reporting order
    pub measurements: Vec<Measurement>,
    pub verdict: Verdict,
}

impl ResultRecord {
    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }

    /// The reading of `metric`, if it was taken
    pub fn value(&self, metric: MetricKind) -> Option<f64> {
        self.measurements
            .iter()
            .find(|m| m.metric == metric)
            .map(|m| m.value)
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Pass => write!(f, "PASS {}", self.name),
            Verdict::Fail(failures) => {
                let reasons: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
                write!(f, "FAIL {}: {}", self.name, reasons.join("; "))
            }
        }
    }
}

/// All records of one harness run
#[derive(Debug, Clone)]
pub struct Summary {
    /// Backend the run measured
    pub backend: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// One record per vector, in execution order
    pub records: Vec<ResultRecord>,
}

impl Summary {
    /// An empty summary stamped with the current time
    pub fn new(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            started_at: Utc::now(),
            records: Vec::new(),
        }
    }

    pub fn passed(&self) -> usize {
        self.records.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit code: success only when every record passed
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }

    /// Record with the given name
    pub fn record(&self, name: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Serializable view of this run
    pub fn to_json_report(&self) -> RunReport<'_> {
        RunReport {
            version: VERSION,
            backend: &self.backend,
            started_at: self.started_at,
            total: self.records.len(),
            passed: self.passed(),
            failed: self.failed(),
            records: &self.records,
        }
    }

    /// Write the JSON run report, creating parent directories if needed
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.to_json_report())?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Run report written");
        Ok(())
    }
}

/// JSON form of a [`Summary`]
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub version: &'static str,
    pub backend: &'a str,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub records: &'a [ResultRecord],
}

/// Write one line per record and a closing summary line
pub fn write_report<W: Write>(summary: &Summary, out: &mut W) -> io::Result<()> {
    for record in &summary.records {
        writeln!(out, "{}", record)?;
    }
    writeln!(
        out,
        "{} of {} vectors passed on {} ({} failed)",
        summary.passed(),
        summary.records.len(),
        summary.backend,
        summary.failed()
    )
}

/// Print the report to stdout and return the process exit code
pub fn report(summary: &Summary) -> i32 {
    let stdout = io::stdout();
    if let Err(e) = write_report(summary, &mut stdout.lock()) {
        tracing::warn!(error = %e, "Failed to write report");
    }
    summary.exit_code()
}
