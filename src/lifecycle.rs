//! Per-thread observation lifecycle
//!
//! The host drives four callbacks. Thread states are encoded in ownership:
//!
//! ```text
//! Uninitialized ──on_thread_start()──▶ Active (ThreadObserver)
//!                                        │ on_syscall_event(id) *
//!                                        ▼
//!                                   on_thread_end(self) ──▶ Finalized (ThreadOutcome)
//! ```
//!
//! `on_thread_end` consumes the observer, so a tally cannot be compared,
//! emitted, or disposed twice. The whitelist is shared read-only through an
//! `Arc`; each tally belongs to exactly one observer and is never shared.
//!
//! # Example
//!
//! ```
//! use vigia::lifecycle::ThreadLifecycleManager;
//! use vigia::report::ThreadTag;
//! use vigia::sink::NullSink;
//! use vigia::whitelist::Whitelist;
//!
//! let manager = ThreadLifecycleManager::new(Whitelist::from_ids([1, 60, 222]), NullSink);
//!
//! let mut observer = manager.on_thread_start(ThreadTag(1));
//! for id in [60, 60, 1] {
//!     observer.on_syscall_event(id);
//! }
//! let outcome = observer.on_thread_end();
//!
//! assert!(outcome.report.fully_matched);
//! assert_eq!(outcome.report.unused.iter().copied().collect::<Vec<_>>(), vec![222]);
//! ```

use crate::report::{ThreadReport, ThreadTag};
use crate::sink::{ReportSink, SinkError};
use crate::tally::{SyscallTally, INITIAL_CAPACITY};
use crate::validator::{self, ValidationReport};
use crate::whitelist::Whitelist;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    finalized: AtomicU64,
    matched: AtomicU64,
}

/// Creates observers and holds the process-wide shared state
pub struct ThreadLifecycleManager {
    whitelist: Arc<Whitelist>,
    sink: Arc<dyn ReportSink>,
    counters: Arc<Counters>,
}

impl ThreadLifecycleManager {
    pub fn new(whitelist: Whitelist, sink: impl ReportSink + 'static) -> Self {
        Self::with_shared(Arc::new(whitelist), Arc::new(sink))
    }

    /// Build from already-shared whitelist and sink
    pub fn with_shared(whitelist: Arc<Whitelist>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            whitelist,
            sink,
            counters: Arc::new(Counters::default()),
        }
    }

    /// A thread started: allocate its tally and hand back the observer
    pub fn on_thread_start(&self, thread: ThreadTag) -> ThreadObserver {
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%thread, "Observing thread");

        ThreadObserver {
            thread,
            tally: SyscallTally::with_capacity(INITIAL_CAPACITY),
            whitelist: Arc::clone(&self.whitelist),
            sink: Arc::clone(&self.sink),
            counters: Arc::clone(&self.counters),
        }
    }

    /// The observed process is exiting
    ///
    /// Best-effort: threads that never reached `on_thread_end` are only
    /// counted, their tallies are not touched.
    pub fn on_process_exit(&self) -> LifecycleSummary {
        let summary = self.summary();
        let pending = summary.pending();
        if pending > 0 {
            tracing::warn!(pending, "Process exited with unfinalized threads");
        }
        tracing::info!(
            started = summary.threads_started,
            finalized = summary.threads_finalized,
            matched = summary.threads_matched,
            "Process exit"
        );
        summary
    }

    /// Current counters
    pub fn summary(&self) -> LifecycleSummary {
        LifecycleSummary {
            threads_started: self.counters.started.load(Ordering::Relaxed),
            threads_finalized: self.counters.finalized.load(Ordering::Relaxed),
            threads_matched: self.counters.matched.load(Ordering::Relaxed),
            degraded: self.whitelist.is_degraded(),
        }
    }
}

/// Active observation of one thread
///
/// Owns the thread's tally. Not `Clone`; move it into whatever per-thread
/// slot the host provides.
pub struct ThreadObserver {
    thread: ThreadTag,
    tally: SyscallTally,
    whitelist: Arc<Whitelist>,
    sink: Arc<dyn ReportSink>,
    counters: Arc<Counters>,
}

impl ThreadObserver {
    pub fn thread(&self) -> ThreadTag {
        self.thread
    }

    /// One syscall was issued on this thread
    #[inline]
    pub fn on_syscall_event(&mut self, syscall_id: u64) {
        self.tally.record(syscall_id);
    }

    /// Read-only access to the tally while the thread is running
    pub fn tally(&self) -> &SyscallTally {
        &self.tally
    }

    /// The thread ended: validate, emit, and release the tally
    ///
    /// The validation report is returned even if a sink fails.
    pub fn on_thread_end(self) -> ThreadOutcome {
        let ThreadObserver {
            thread,
            tally,
            whitelist,
            sink,
            counters,
        } = self;

        let report = validator::compare(tally.snapshot(), &whitelist);

        let sink_failures = match sink.emit(&ThreadReport {
            thread,
            records: tally.snapshot(),
            validation: &report,
        }) {
            Ok(()) => Vec::new(),
            Err(e) => e.into_failures(),
        };

        let outcome = ThreadOutcome {
            thread,
            distinct_syscalls: tally.len(),
            total_calls: tally.total_calls(),
            degraded: whitelist.is_degraded(),
            report,
            sink_failures,
        };
        tally.dispose();

        counters.finalized.fetch_add(1, Ordering::Relaxed);
        if outcome.report.fully_matched {
            counters.matched.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!(
            %thread,
            distinct = outcome.distinct_syscalls,
            unauthorized = outcome.report.unauthorized.len(),
            unused = outcome.report.unused.len(),
            fully_matched = outcome.report.fully_matched,
            "Thread finalized"
        );

        outcome
    }
}

/// Result of finalizing one thread
#[derive(Debug)]
pub struct ThreadOutcome {
    pub thread: ThreadTag,
    pub report: ValidationReport,
    pub distinct_syscalls: usize,
    pub total_calls: u64,
    /// The whitelist failed to load, so every syscall counts as unauthorized
    pub degraded: bool,
    /// Sinks that failed; the report above is still valid
    pub sink_failures: Vec<SinkError>,
}

/// Process-wide lifecycle counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSummary {
    pub threads_started: u64,
    pub threads_finalized: u64,
    pub threads_matched: u64,
    pub degraded: bool,
}

impl LifecycleSummary {
    /// Threads started but never finalized
    pub fn pending(&self) -> u64 {
        self.threads_started.saturating_sub(self.threads_finalized)
    }

    /// Every finalized thread was fully matched and the whitelist loaded
    pub fn all_matched(&self) -> bool {
        !self.degraded && self.threads_matched == self.threads_finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    struct BrokenSink;

    impl ReportSink for BrokenSink {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn emit(&self, _report: &ThreadReport<'_>) -> Result<(), SinkError> {
            Err(SinkError::Write {
                path: PathBuf::from("/readonly/report.txt"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }
    }

    fn set(ids: &[u64]) -> BTreeSet<u64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_observer_tallies_events() {
        let manager = ThreadLifecycleManager::new(Whitelist::from_ids([1]), NullSink);
        let mut observer = manager.on_thread_start(ThreadTag(10));
        observer.on_syscall_event(1);
        observer.on_syscall_event(1);

        assert_eq!(observer.thread(), ThreadTag(10));
        assert_eq!(observer.tally().count_of(1), 2);
    }

    #[test]
    fn test_thread_end_reports_unauthorized() {
        let manager = ThreadLifecycleManager::new(Whitelist::from_ids([1, 60]), NullSink);
        let mut observer = manager.on_thread_start(ThreadTag(1));
        observer.on_syscall_event(1);
        observer.on_syscall_event(999);

        let outcome = observer.on_thread_end();
        assert_eq!(outcome.report.unauthorized, set(&[999]));
        assert_eq!(outcome.report.unused, set(&[60]));
        assert!(!outcome.report.fully_matched);
        assert_eq!(outcome.total_calls, 2);
        assert!(!outcome.degraded);
    }

    #[test]
    fn test_sink_failure_keeps_report() {
        let manager = ThreadLifecycleManager::new(Whitelist::from_ids([1]), BrokenSink);
        let mut observer = manager.on_thread_start(ThreadTag(1));
        observer.on_syscall_event(1);

        let outcome = observer.on_thread_end();
        assert!(outcome.report.fully_matched);
        assert_eq!(outcome.sink_failures.len(), 1);
    }

    #[test]
    fn test_degraded_flag_propagates() {
        let manager = ThreadLifecycleManager::new(Whitelist::degraded("missing"), NullSink);
        let mut observer = manager.on_thread_start(ThreadTag(1));
        observer.on_syscall_event(1);
        observer.on_syscall_event(2);

        let outcome = observer.on_thread_end();
        assert!(outcome.degraded);
        assert_eq!(outcome.report.unauthorized, set(&[1, 2]));
        assert!(!manager.summary().all_matched());
    }

    #[test]
    fn test_summary_counts_pending_threads() {
        let manager = ThreadLifecycleManager::new(Whitelist::from_ids([1]), NullSink);
        let finished = manager.on_thread_start(ThreadTag(1));
        let _abandoned = manager.on_thread_start(ThreadTag(2));
        finished.on_thread_end();

        let summary = manager.on_process_exit();
        assert_eq!(summary.threads_started, 2);
        assert_eq!(summary.threads_finalized, 1);
        assert_eq!(summary.threads_matched, 1);
        assert_eq!(summary.pending(), 1);
    }

    #[test]
    fn test_observer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ThreadObserver>();
    }
}
