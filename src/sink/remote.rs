//! Best-effort export to a remote collector
//!
//! One HTTP POST per finished thread, carrying the same rendering as the local
//! report file. Transport errors and non-success responses are logged and
//! counted, never returned: the local report has already been committed by
//! the time this sink runs.

use super::{ReportSink, SinkError};
use crate::cli::OutputFormat;
use crate::report::ThreadReport;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Collector endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/api/data/saveSyscallData";

/// Export counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteStats {
    pub sent: u64,
    pub failed: u64,
}

/// POSTs thread reports to a collector endpoint
#[derive(Debug)]
pub struct RemoteSink {
    endpoint: String,
    format: OutputFormat,
    client: Client,
    sent: AtomicU64,
    failed: AtomicU64,
}

impl RemoteSink {
    /// Create a sink posting to `endpoint` with a per-request timeout
    ///
    /// # Errors
    /// Returns `SinkError::RemoteSetup` if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        format: OutputFormat,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        // Collectors are addressed directly; proxy variables from the traced
        // program's environment are ignored
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| SinkError::RemoteSetup(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            format,
            client,
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stats(&self) -> RemoteStats {
        RemoteStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn content_type(&self) -> &'static str {
        match self.format {
            OutputFormat::Text => "text/plain",
            OutputFormat::Json => "application/json",
        }
    }

    fn post(&self, body: String) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, self.content_type())
            .body(body)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("collector responded with {}", status))
        }
    }
}

impl ReportSink for RemoteSink {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn emit(&self, report: &ThreadReport<'_>) -> Result<(), SinkError> {
        let body = match report.render(self.format) {
            Ok(body) => body,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(thread = %report.thread, "Remote export skipped: {}", e);
                return Ok(());
            }
        };

        match self.post(body) {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(thread = %report.thread, endpoint = %self.endpoint, "Exported syscall report");
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    thread = %report.thread,
                    endpoint = %self.endpoint,
                    "Remote export failed: {}",
                    e
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ThreadTag;
    use crate::validator::ValidationReport;

    #[test]
    fn test_unreachable_collector_is_swallowed() {
        // Port 9 (discard) is closed on test machines, so the connect fails fast
        let sink = RemoteSink::new(
            "http://127.0.0.1:9/api/data/saveSyscallData",
            OutputFormat::Text,
            Duration::from_millis(500),
        )
        .unwrap();

        let validation = ValidationReport::default();
        let result = sink.emit(&ThreadReport {
            thread: ThreadTag(1),
            records: &[],
            validation: &validation,
        });

        assert!(result.is_ok());
        assert_eq!(sink.stats(), RemoteStats { sent: 0, failed: 1 });
    }

    #[test]
    fn test_invalid_endpoint_is_swallowed() {
        let sink = RemoteSink::new("not a url", OutputFormat::Json, Duration::from_millis(100))
            .unwrap();
        let validation = ValidationReport::default();

        assert!(sink
            .emit(&ThreadReport {
                thread: ThreadTag(2),
                records: &[],
                validation: &validation,
            })
            .is_ok());
        assert_eq!(sink.stats().failed, 1);
    }

    #[test]
    fn test_content_type_follows_format() {
        let text = RemoteSink::new(DEFAULT_ENDPOINT, OutputFormat::Text, Duration::from_secs(1))
            .unwrap();
        let json = RemoteSink::new(DEFAULT_ENDPOINT, OutputFormat::Json, Duration::from_secs(1))
            .unwrap();
        assert_eq!(text.content_type(), "text/plain");
        assert_eq!(json.content_type(), "application/json");
        assert_eq!(text.endpoint(), DEFAULT_ENDPOINT);
    }
}
