//! Report sinks
//!
//! A sink receives one `ThreadReport` per finished thread. Sinks are shared
//! by every thread that finalizes, so implementations must be `Send + Sync`
//! and serialize their own writes.
//!
//! - `LocalFileSink`: durable per-thread report file
//! - `RemoteSink`: best-effort HTTP POST to a collector
//! - `ConsoleSink`: human-readable summary on stderr
//! - `CompositeSink`: runs several sinks in order, collecting failures

pub mod console;
pub mod file;
pub mod remote;

pub use console::ConsoleSink;
pub use file::LocalFileSink;
pub use remote::RemoteSink;

use crate::report::ThreadReport;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by report sinks
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Failed to set up remote export: {0}")]
    RemoteSetup(String),

    #[error("Console output failed: {0}")]
    Console(std::io::Error),

    #[error("{} sink(s) failed", .0.len())]
    Composite(Vec<SinkError>),
}

impl SinkError {
    /// Flatten composite errors into their individual failures
    pub fn into_failures(self) -> Vec<SinkError> {
        match self {
            SinkError::Composite(errors) => errors
                .into_iter()
                .flat_map(SinkError::into_failures)
                .collect(),
            other => vec![other],
        }
    }
}

/// Destination for finished thread reports
pub trait ReportSink: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Export one thread's tally and validation report
    fn emit(&self, report: &ThreadReport<'_>) -> Result<(), SinkError>;
}

/// Runs a list of sinks in order
///
/// Every sink is attempted even if an earlier one fails; the failures are
/// returned together as `SinkError::Composite`.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink; sinks run in insertion order
    pub fn with(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names of the configured sinks in run order
    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
}

impl ReportSink for CompositeSink {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn emit(&self, report: &ThreadReport<'_>) -> Result<(), SinkError> {
        let mut failures = Vec::new();

        for sink in &self.sinks {
            if let Err(e) = sink.emit(report) {
                tracing::warn!(sink = sink.name(), thread = %report.thread, "{}", e);
                failures.push(e);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SinkError::Composite(failures))
        }
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn name(&self) -> &'static str {
        "null"
    }

    fn emit(&self, _report: &ThreadReport<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}
