//! Whitelist validation
//!
//! Compares a tally snapshot against the whitelist in both directions:
//! observed-but-not-whitelisted ids are `unauthorized`, whitelisted-but-never-
//! observed ids are `unused`. Only unauthorized ids fail the match; unused ids
//! are informational.

use crate::tally::SyscallRecord;
use crate::whitelist::Whitelist;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Outcome of comparing one thread's syscalls against the whitelist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Observed ids missing from the whitelist
    pub unauthorized: BTreeSet<u64>,
    /// Whitelisted ids never observed
    pub unused: BTreeSet<u64>,
    /// True iff `unauthorized` is empty
    pub fully_matched: bool,
}

impl ValidationReport {
    /// One-line verdict for console output
    pub fn verdict(&self) -> &'static str {
        if self.fully_matched {
            "All system calls matched"
        } else {
            "All system calls did not match"
        }
    }
}

/// Compare a tally snapshot against the whitelist
pub fn compare(tally: &[SyscallRecord], whitelist: &Whitelist) -> ValidationReport {
    let observed: HashSet<u64> = tally.iter().map(|r| r.syscall_id).collect();

    let unused: BTreeSet<u64> = whitelist
        .ids()
        .filter(|id| !observed.contains(id))
        .collect();

    let unauthorized: BTreeSet<u64> = tally
        .iter()
        .map(|r| r.syscall_id)
        .filter(|&id| !whitelist.contains(id))
        .collect();

    ValidationReport {
        fully_matched: unauthorized.is_empty(),
        unauthorized,
        unused,
    }
}
