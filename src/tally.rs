//! Per-thread syscall tally
//!
//! A `SyscallTally` counts occurrences of each syscall id seen on one thread.
//! Records keep first-seen order; an FNV index maps each id to its slot so
//! `record` stays O(1) on the hot path.

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Initial record capacity reserved when a thread starts.
///
/// Most threads touch a few dozen distinct syscalls, so the hot path rarely
/// has to grow the backing storage.
pub const INITIAL_CAPACITY: usize = 64;

/// Occurrence count for one syscall id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyscallRecord {
    /// Syscall number as delivered by the host
    pub syscall_id: u64,
    /// Number of times the syscall was issued
    pub call_count: u64,
}

/// Accumulates syscall counts for a single observed thread
#[derive(Debug, Default)]
pub struct SyscallTally {
    records: Vec<SyscallRecord>,
    index: FnvHashMap<u64, usize>,
}

impl SyscallTally {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tally with room for `capacity` distinct syscalls
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            index: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Record one occurrence of `syscall_id`
    pub fn record(&mut self, syscall_id: u64) {
        match self.index.get(&syscall_id) {
            Some(&slot) => {
                let record = &mut self.records[slot];
                record.call_count = record.call_count.saturating_add(1);
            }
            None => {
                self.index.insert(syscall_id, self.records.len());
                self.records.push(SyscallRecord {
                    syscall_id,
                    call_count: 1,
                });
            }
        }
    }

    /// Read-only view of the records in first-seen order
    pub fn snapshot(&self) -> &[SyscallRecord] {
        &self.records
    }

    /// Whether `syscall_id` has been recorded at least once
    pub fn contains(&self, syscall_id: u64) -> bool {
        self.index.contains_key(&syscall_id)
    }

    /// Call count for `syscall_id`, or 0 if never seen
    pub fn count_of(&self, syscall_id: u64) -> u64 {
        self.index
            .get(&syscall_id)
            .map(|&slot| self.records[slot].call_count)
            .unwrap_or(0)
    }

    /// Number of distinct syscalls recorded
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no syscall has been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total occurrences across all syscalls
    pub fn total_calls(&self) -> u64 {
        self.records.iter().map(|r| r.call_count).sum()
    }

    /// Release the tally's storage.
    ///
    /// Takes `self` by value, so a disposed tally can no longer be reached.
    pub fn dispose(self) {
        drop(self);
    }
}
