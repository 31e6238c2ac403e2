//! Durable per-thread report files
//!
//! Each finished thread gets its own file, `<stem>-<thread>.<ext>`, inside the
//! output directory. Writes are serialized behind a mutex and land through a
//! temporary file plus rename, so concurrent thread-ends never interleave and
//! a reader never sees a half-written report. A thread id that was reused by
//! the host gets a numbered suffix instead of overwriting the earlier report.

use super::{ReportSink, SinkError};
use crate::cli::OutputFormat;
use crate::report::{ThreadReport, ThreadTag};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default file stem for runtime syscall reports
pub const DEFAULT_STEM: &str = "syscall_list_runtime";

/// Writes each thread report to its own file
#[derive(Debug)]
pub struct LocalFileSink {
    dir: PathBuf,
    stem: String,
    format: OutputFormat,
    lock: Mutex<()>,
}

impl LocalFileSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            stem: DEFAULT_STEM.to_string(),
            format,
            lock: Mutex::new(()),
        }
    }

    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.stem = stem.into();
        self
    }

    fn extension(&self) -> &'static str {
        match self.format {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }

    /// First free report path for `thread`
    fn next_path(&self, thread: ThreadTag) -> PathBuf {
        let ext = self.extension();
        let base = self.dir.join(format!("{}-{}.{}", self.stem, thread, ext));
        if !base.exists() {
            return base;
        }

        (1u32..)
            .map(|n| self.dir.join(format!("{}-{}-{}.{}", self.stem, thread, n, ext)))
            .find(|p| !p.exists())
            .unwrap_or(base)
    }

    /// Write `report` and return the path it landed at
    pub fn write(&self, report: &ThreadReport<'_>) -> Result<PathBuf, SinkError> {
        let content = report.render(self.format)?;

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        fs::create_dir_all(&self.dir).map_err(|source| SinkError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.next_path(report.thread);
        let tmp = path.with_extension("tmp");

        commit(&tmp, &path, &content)?;

        tracing::debug!(thread = %report.thread, path = %path.display(), "Wrote syscall report");
        Ok(path)
    }
}

/// Write `content` to `tmp` and move it over `path`; `tmp` never outlives a failure
fn commit(tmp: &Path, path: &Path, content: &str) -> Result<(), SinkError> {
    if let Err(source) = fs::write(tmp, content) {
        let _ = fs::remove_file(tmp);
        return Err(SinkError::Write {
            path: tmp.to_path_buf(),
            source,
        });
    }
    if let Err(source) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(SinkError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

impl ReportSink for LocalFileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn emit(&self, report: &ThreadReport<'_>) -> Result<(), SinkError> {
        self.write(report).map(|_| ())
    }
}
