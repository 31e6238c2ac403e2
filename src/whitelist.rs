//! Syscall whitelist loading
//!
//! The whitelist is a text file of unsigned syscall numbers separated by
//! whitespace or newlines. It is loaded once at startup and shared read-only
//! between every observed thread.
//!
//! A whitelist that cannot be read does not abort the run: the set is empty
//! and the load status is `Degraded`, so every observed syscall surfaces as
//! unauthorized and callers can tell why.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading a whitelist file
#[derive(Error, Debug)]
pub enum WhitelistError {
    #[error("Failed to read whitelist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How the whitelist was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Parsed from a file; `skipped` counts malformed tokens that were ignored
    Loaded { path: PathBuf, skipped: usize },
    /// Built in memory (tests, embedding hosts)
    Inline,
    /// The source could not be read; the whitelist is empty
    Degraded { reason: String },
}

/// Immutable set of authorized syscall ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelist {
    ids: BTreeSet<u64>,
    status: LoadStatus,
}

impl Whitelist {
    /// Build a whitelist from ids already in memory
    pub fn from_ids<I: IntoIterator<Item = u64>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            status: LoadStatus::Inline,
        }
    }

    /// Empty whitelist flagged as degraded
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            ids: BTreeSet::new(),
            status: LoadStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    /// Parse whitelist text, returning the ids and the number of skipped tokens
    pub fn parse(content: &str) -> (BTreeSet<u64>, usize) {
        let mut ids = BTreeSet::new();
        let mut skipped = 0;

        for token in content.split_whitespace() {
            match token.parse::<u64>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => {
                    tracing::warn!(token, "Skipping malformed whitelist entry");
                    skipped += 1;
                }
            }
        }

        (ids, skipped)
    }

    /// Read and parse a whitelist file
    ///
    /// # Errors
    /// Returns `WhitelistError::Read` if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WhitelistError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| WhitelistError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // Invalid UTF-8 only spoils the token it sits in
        let content = String::from_utf8_lossy(&bytes);
        let (ids, skipped) = Self::parse(&content);
        tracing::debug!(
            path = %path.display(),
            entries = ids.len(),
            skipped,
            "Loaded syscall whitelist"
        );

        Ok(Self {
            ids,
            status: LoadStatus::Loaded {
                path: path.to_path_buf(),
                skipped,
            },
        })
    }

    /// Load a whitelist file, falling back to a degraded empty whitelist
    pub fn load_or_degraded<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path) {
            Ok(whitelist) => whitelist,
            Err(e) => {
                tracing::warn!("{}; every observed syscall will be unauthorized", e);
                Self::degraded(e.to_string())
            }
        }
    }

    /// Whether `syscall_id` is authorized
    pub fn contains(&self, syscall_id: u64) -> bool {
        self.ids.contains(&syscall_id)
    }

    /// Authorized ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// True if the whitelist could not be loaded
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, LoadStatus::Degraded { .. })
    }
}
