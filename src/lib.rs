//! Vigia - per-thread syscall tally with whitelist validation
//!
//! This library counts the system calls each thread of an observed program
//! issues, compares the observed set against a whitelist in both directions,
//! and exports the per-thread results to local report files and, best-effort,
//! to a remote collector.

pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod observer_table;
pub mod report;
pub mod sink;
pub mod syscalls;
pub mod tally;
pub mod tracer;
pub mod validator;
pub mod whitelist;
