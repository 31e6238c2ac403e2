//! Human-readable thread summaries

use super::{ReportSink, SinkError};
use crate::report::ThreadReport;
use crate::syscalls::{self, Arch};
use std::io::Write;
use std::sync::Mutex;

/// Prints per-syscall counts, whitelist mismatches, and the verdict
pub struct ConsoleSink {
    arch: Arch,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink writing to stderr, matching the statistics output
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            arch: Arch::native(),
            writer: Mutex::new(writer),
        }
    }

    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    /// Format the full summary for one thread
    pub fn format(&self, report: &ThreadReport<'_>) -> String {
        let mut out = format!("[vigia: thread {} finished]\n", report.thread);

        for record in report.records {
            out.push_str(&format!(
                "System call {} ({}) called {} times\n",
                record.syscall_id,
                syscalls::display_name(self.arch, record.syscall_id),
                record.call_count
            ));
        }

        for id in &report.validation.unused {
            out.push_str(&format!(
                "System call found in whitelist was not used during runtime: {}\n",
                id
            ));
        }
        for id in &report.validation.unauthorized {
            out.push_str(&format!("System call: {}, was not in the whitelist\n", id));
        }

        out.push_str(report.validation.verdict());
        out.push('\n');
        out
    }
}

impl ReportSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit(&self, report: &ThreadReport<'_>) -> Result<(), SinkError> {
        let text = self.format(report);
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer
            .write_all(text.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(SinkError::Console)
    }
}
