//! Host-side per-thread slots
//!
//! Hosts that observe many threads from one place (such as the ptrace driver)
//! keep each thread's `ThreadObserver` here between callbacks, keyed by thread
//! tag. A thread's observer moves out of the table when the thread ends.

use crate::lifecycle::{LifecycleSummary, ThreadLifecycleManager, ThreadOutcome};
use crate::report::ThreadTag;
use std::collections::HashMap;

pub use crate::lifecycle::ThreadObserver;

/// Observers for every live thread
pub struct ObserverTable {
    manager: ThreadLifecycleManager,
    observers: HashMap<ThreadTag, ThreadObserver>,
}

impl ObserverTable {
    pub fn new(manager: ThreadLifecycleManager) -> Self {
        Self {
            manager,
            observers: HashMap::new(),
        }
    }

    pub fn manager(&self) -> &ThreadLifecycleManager {
        &self.manager
    }

    /// Start observing `thread`; returns false if it is already active
    pub fn on_thread_start(&mut self, thread: ThreadTag) -> bool {
        if self.observers.contains_key(&thread) {
            return false;
        }
        let observer = self.manager.on_thread_start(thread);
        self.observers.insert(thread, observer);
        true
    }

    /// Record a syscall for `thread`
    ///
    /// A thread whose start was not reported yet (the host can deliver its
    /// first syscall stop before the clone notification) is started here.
    pub fn on_syscall_event(&mut self, thread: ThreadTag, syscall_id: u64) {
        let manager = &self.manager;
        self.observers
            .entry(thread)
            .or_insert_with(|| {
                tracing::debug!(%thread, "Syscall from unannounced thread");
                manager.on_thread_start(thread)
            })
            .on_syscall_event(syscall_id);
    }

    /// Finalize `thread`; `None` if it was never started
    pub fn on_thread_end(&mut self, thread: ThreadTag) -> Option<ThreadOutcome> {
        self.observers
            .remove(&thread)
            .map(ThreadObserver::on_thread_end)
    }

    pub fn is_active(&self, thread: ThreadTag) -> bool {
        self.observers.contains_key(&thread)
    }

    pub fn active_threads(&self) -> usize {
        self.observers.len()
    }

    /// Process exit: report the summary and drop any unfinalized observers
    pub fn on_process_exit(mut self) -> LifecycleSummary {
        let summary = self.manager.on_process_exit();
        for (thread, observer) in self.observers.drain() {
            tracing::debug!(
                %thread,
                distinct = observer.tally().len(),
                "Dropping unfinalized observer"
            );
        }
        summary
    }
}
