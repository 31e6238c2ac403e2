//! Thread report rendering
//!
//! The same rendering is written to the local report file and posted to the
//! remote collector, so both destinations always agree.

use crate::cli::OutputFormat;
use crate::tally::SyscallRecord;
use crate::validator::ValidationReport;
use serde::Serialize;
use std::fmt;

/// Identifies the observed thread in outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ThreadTag(pub u64);

impl fmt::Display for ThreadTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a sink receives for one finished thread
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThreadReport<'a> {
    pub thread: ThreadTag,
    pub records: &'a [SyscallRecord],
    pub validation: &'a ValidationReport,
}

impl ThreadReport<'_> {
    /// Render as one `"<id>, <count>"` line per record, first-seen order
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.records.len() * 12);
        for record in self.records {
            out.push_str(&format!("{}, {}\n", record.syscall_id, record.call_count));
        }
        out
    }

    /// Render as a JSON document with records and validation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => self.to_json(),
        }
    }
}

/// Parse text produced by `ThreadReport::to_text` back into records
pub fn parse_text(content: &str) -> Option<Vec<SyscallRecord>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (id, count) = line.split_once(',')?;
            Some(SyscallRecord {
                syscall_id: id.trim().parse().ok()?,
                call_count: count.trim().parse().ok()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::SyscallTally;
    use crate::validator::compare;
    use crate::whitelist::Whitelist;

    fn sample() -> (SyscallTally, ValidationReport) {
        let mut tally = SyscallTally::new();
        for id in [60, 60, 1] {
            tally.record(id);
        }
        let report = compare(tally.snapshot(), &Whitelist::from_ids([1, 60, 222]));
        (tally, report)
    }

    #[test]
    fn test_text_lines_in_first_seen_order() {
        let (tally, report) = sample();
        let thread = ThreadReport {
            thread: ThreadTag(42),
            records: tally.snapshot(),
            validation: &report,
        };
        assert_eq!(thread.to_text(), "60, 2\n1, 1\n");
    }

    #[test]
    fn test_text_empty_tally() {
        let report = ValidationReport::default();
        let thread = ThreadReport {
            thread: ThreadTag(1),
            records: &[],
            validation: &report,
        };
        assert_eq!(thread.to_text(), "");
    }

    #[test]
    fn test_parse_text_reads_rendered_output() {
        let parsed = parse_text("60, 2\n1, 1\n").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].syscall_id, 60);
        assert_eq!(parsed[0].call_count, 2);
    }

    #[test]
    fn test_parse_text_rejects_garbage() {
        assert!(parse_text("60 2\n").is_none());
        assert!(parse_text("x, 2\n").is_none());
    }

    #[test]
    fn test_json_contains_report_fields() {
        let (tally, report) = sample();
        let thread = ThreadReport {
            thread: ThreadTag(7),
            records: tally.snapshot(),
            validation: &report,
        };
        let json = thread.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["thread"], 7);
        assert_eq!(value["records"][0]["syscall_id"], 60);
        assert_eq!(value["records"][0]["call_count"], 2);
        assert_eq!(value["validation"]["unused"][0], 222);
        assert_eq!(value["validation"]["fully_matched"], true);
    }

    #[test]
    fn test_thread_tag_display() {
        assert_eq!(ThreadTag(1234).to_string(), "1234");
    }
}
