//! ptrace host driver
//!
//! Runs a command under ptrace and turns tracee events into lifecycle
//! callbacks:
//!
//! - first stop of a new thread (or a clone event naming it) → `on_thread_start`
//! - syscall-entry stop → `on_syscall_event(orig_rax)`
//! - thread exit → `on_thread_end`
//! - no tracees left → `on_process_exit`
//!
//! All tracee threads are observed from this single tracer thread; each one
//! still owns a separate tally inside the `ObserverTable`.

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, fork, write, ForkResult, Pid};
use std::collections::HashSet;
use std::ffi::CString;

use crate::lifecycle::{LifecycleSummary, ThreadLifecycleManager, ThreadOutcome};
use crate::observer_table::ObserverTable;
use crate::report::ThreadTag;

/// Options for a traced run
#[derive(Debug, Clone, Copy, Default)]
pub struct TracerOptions {
    /// Also trace child processes created by fork/vfork
    pub follow_forks: bool,
}

/// Result of a traced run
#[derive(Debug)]
pub struct TraceRun {
    /// Exit code of the traced program (128 + signal if killed)
    pub exit_code: i32,
    pub outcomes: Vec<ThreadOutcome>,
    pub summary: LifecycleSummary,
}

impl TraceRun {
    /// Every observed thread stayed within the whitelist
    pub fn all_matched(&self) -> bool {
        self.summary.all_matched()
    }
}

fn tag(pid: Pid) -> ThreadTag {
    ThreadTag(pid.as_raw() as u64)
}

/// Exit code of a child that could not exec the command
const EXEC_FAILED: i32 = 127;

/// Trace a command and validate each of its threads
pub fn trace_command(
    command: &[String],
    manager: ThreadLifecycleManager,
    options: TracerOptions,
) -> Result<TraceRun> {
    if command.is_empty() {
        anyhow::bail!("Command array is empty");
    }

    // Everything the child needs is prepared here: sinks may already run
    // threads, so the child is limited to async-signal-safe calls until exec
    let argv = exec_args(command)?;
    let exec_failed = format!("Failed to exec {}\n", command[0]);

    // Fork: parent will trace, child will exec
    match unsafe { fork() }.context("Failed to fork")? {
        ForkResult::Parent { child } => trace_child(child, manager, options),
        ForkResult::Child => {
            if ptrace::traceme().is_ok() {
                let _ = execvp(&argv[0], &argv);
            }

            // If we get here, traceme or exec failed
            let _ = write(std::io::stderr(), exec_failed.as_bytes());
            unsafe { nix::libc::_exit(EXEC_FAILED) }
        }
    }
}

/// Command line as C strings for `execvp`
fn exec_args(command: &[String]) -> Result<Vec<CString>> {
    command
        .iter()
        .map(|arg| {
            CString::new(arg.as_bytes())
                .with_context(|| format!("Argument contains a NUL byte: {:?}", arg))
        })
        .collect()
}

/// Per-tracee bookkeeping for the wait loop
#[derive(Default)]
struct TraceeState {
    /// Threads currently between syscall entry and exit
    in_syscall: HashSet<Pid>,
    /// Threads that reported their initial stop
    attached: HashSet<Pid>,
}

fn trace_child(
    child: Pid,
    manager: ThreadLifecycleManager,
    options: TracerOptions,
) -> Result<TraceRun> {
    // Wait for initial SIGTRAP after exec under PTRACE_TRACEME
    match waitpid(child, None).context("Failed to wait for child")? {
        WaitStatus::Exited(_, code) => return Ok(unstarted_run(code, manager)),
        WaitStatus::Signaled(_, sig, _) => return Ok(unstarted_run(128 + sig as i32, manager)),
        _ => {}
    }

    let mut ptrace_options = ptrace::Options::PTRACE_O_TRACESYSGOOD
        | ptrace::Options::PTRACE_O_EXITKILL
        | ptrace::Options::PTRACE_O_TRACECLONE
        | ptrace::Options::PTRACE_O_TRACEEXEC;

    if options.follow_forks {
        ptrace_options |=
            ptrace::Options::PTRACE_O_TRACEFORK | ptrace::Options::PTRACE_O_TRACEVFORK;
    }

    ptrace::setoptions(child, ptrace_options).context("Failed to set ptrace options")?;

    let mut table = ObserverTable::new(manager);
    let mut state = TraceeState::default();
    let mut outcomes = Vec::new();
    let mut exit_code = 0;

    table.on_thread_start(tag(child));
    state.attached.insert(child);
    ptrace::syscall(child, None).context("Failed to PTRACE_SYSCALL")?;

    loop {
        let status = match waitpid(None, Some(WaitPidFlag::__WALL)) {
            Ok(status) => status,
            Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e).context("Failed to waitpid"),
        };

        match status {
            WaitStatus::PtraceSyscall(pid) => {
                if state.in_syscall.remove(&pid) {
                    // Syscall exit
                } else {
                    match syscall_number(pid) {
                        Ok(syscall_id) => table.on_syscall_event(tag(pid), syscall_id),
                        Err(e) => {
                            tracing::warn!(thread = %pid, "Failed to get registers: {}", e)
                        }
                    }
                    state.in_syscall.insert(pid);
                }
                resume(pid, None);
            }
            WaitStatus::PtraceEvent(pid, _, event)
                if event == ptrace::Event::PTRACE_EVENT_EXEC as i32 =>
            {
                match ptrace::getevent(pid) {
                    Ok(former) => {
                        let former = Pid::from_raw(former as i32);
                        handle_exec(&mut table, &mut state, &mut outcomes, pid, former);
                    }
                    Err(e) => tracing::debug!(thread = %pid, "PTRACE_GETEVENTMSG failed: {}", e),
                }
                resume(pid, None);
            }
            WaitStatus::PtraceEvent(pid, _, event) => {
                if is_spawn_event(event) {
                    if let Ok(new) = ptrace::getevent(pid) {
                        let new = Pid::from_raw(new as i32);
                        table.on_thread_start(tag(new));
                        tracing::debug!(parent = %pid, thread = %new, "New tracee");
                    }
                }
                resume(pid, None);
            }
            WaitStatus::Stopped(pid, sig) => {
                if sig == Signal::SIGSTOP && state.attached.insert(pid) {
                    // Initial stop of an auto-attached thread
                    table.on_thread_start(tag(pid));
                    resume(pid, None);
                } else {
                    resume(pid, Some(sig));
                }
            }
            WaitStatus::Exited(pid, code) => {
                if pid == child {
                    exit_code = code;
                }
                finish(&mut table, &mut state, &mut outcomes, pid);
            }
            WaitStatus::Signaled(pid, sig, _) => {
                if pid == child {
                    eprintln!("Child killed by signal: {:?}", sig);
                    exit_code = 128 + sig as i32;
                }
                finish(&mut table, &mut state, &mut outcomes, pid);
            }
            _ => {}
        }
    }

    let summary = table.on_process_exit();
    Ok(TraceRun {
        exit_code,
        outcomes,
        summary,
    })
}

/// The child exited before the first trace stop; no thread was observed
fn unstarted_run(exit_code: i32, manager: ThreadLifecycleManager) -> TraceRun {
    TraceRun {
        exit_code,
        outcomes: Vec::new(),
        summary: manager.on_process_exit(),
    }
}

/// Syscall number of a tracee stopped at syscall entry
#[cfg(target_arch = "x86_64")]
fn syscall_number(pid: Pid) -> nix::Result<u64> {
    ptrace::getregs(pid).map(|regs| regs.orig_rax)
}

#[cfg(target_arch = "aarch64")]
fn syscall_number(pid: Pid) -> nix::Result<u64> {
    // Syscall number in x8
    ptrace::getregset::<ptrace::regset::NT_PRSTATUS>(pid).map(|regs| regs.regs[8])
}

fn is_spawn_event(event: i32) -> bool {
    event == ptrace::Event::PTRACE_EVENT_CLONE as i32
        || event == ptrace::Event::PTRACE_EVENT_FORK as i32
        || event == ptrace::Event::PTRACE_EVENT_VFORK as i32
}

/// Resume a stopped tracee; a tracee that vanished in the meantime is ignored
fn resume(pid: Pid, sig: Option<Signal>) {
    if let Err(e) = ptrace::syscall(pid, sig) {
        tracing::debug!(thread = %pid, "PTRACE_SYSCALL failed: {}", e);
    }
}

fn finish(
    table: &mut ObserverTable,
    state: &mut TraceeState,
    outcomes: &mut Vec<ThreadOutcome>,
    pid: Pid,
) {
    state.in_syscall.remove(&pid);
    state.attached.remove(&pid);
    if let Some(outcome) = table.on_thread_end(tag(pid)) {
        outcomes.push(outcome);
    }
}

/// A thread of the group called execve
///
/// A non-leader thread that execs takes over the leader's tid. The execing
/// thread's old tid is gone and the old leader thread is gone, so both
/// observers end here and the new program image starts with a fresh one. The
/// tracee is still inside execve, so its next syscall stop is the exit.
fn handle_exec(
    table: &mut ObserverTable,
    state: &mut TraceeState,
    outcomes: &mut Vec<ThreadOutcome>,
    pid: Pid,
    former: Pid,
) {
    if former == pid {
        return;
    }

    tracing::debug!(thread = %pid, former = %former, "Exec from non-leader thread");
    finish(table, state, outcomes, former);
    finish(table, state, outcomes, pid);

    table.on_thread_start(tag(pid));
    state.attached.insert(pid);
    state.in_syscall.insert(pid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use crate::whitelist::Whitelist;

    #[test]
    fn test_trace_command_requires_nonempty_array() {
        let empty: Vec<String> = vec![];
        let manager = ThreadLifecycleManager::new(Whitelist::from_ids(std::iter::empty()), NullSink);
        let result = trace_command(&empty, manager, TracerOptions::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_spawn_events() {
        assert!(is_spawn_event(ptrace::Event::PTRACE_EVENT_CLONE as i32));
        assert!(is_spawn_event(ptrace::Event::PTRACE_EVENT_FORK as i32));
        assert!(!is_spawn_event(ptrace::Event::PTRACE_EVENT_EXEC as i32));
    }

    fn table() -> ObserverTable {
        ObserverTable::new(ThreadLifecycleManager::new(
            Whitelist::from_ids([59]),
            NullSink,
        ))
    }

    #[test]
    fn test_exec_from_non_leader_ends_both_threads() {
        let leader = Pid::from_raw(100);
        let worker = Pid::from_raw(101);
        let mut table = table();
        let mut state = TraceeState::default();
        let mut outcomes = Vec::new();

        table.on_thread_start(tag(leader));
        table.on_thread_start(tag(worker));
        table.on_syscall_event(tag(leader), 1);
        table.on_syscall_event(tag(worker), 59);
        state.attached.extend([leader, worker]);
        state.in_syscall.insert(worker);

        handle_exec(&mut table, &mut state, &mut outcomes, leader, worker);

        let ended: Vec<_> = outcomes.iter().map(|o| o.thread).collect();
        assert_eq!(ended, vec![tag(worker), tag(leader)]);
        assert!(outcomes[0].report.fully_matched);
        assert!(!outcomes[1].report.fully_matched);

        assert!(!table.is_active(tag(worker)));
        assert!(table.is_active(tag(leader)));
        assert!(state.in_syscall.contains(&leader));
        assert!(!state.in_syscall.contains(&worker));
        assert!(!state.attached.contains(&worker));

        let summary = table.on_process_exit();
        assert_eq!(summary.threads_started, 3);
        assert_eq!(summary.threads_finalized, 2);
    }

    #[test]
    fn test_exec_from_leader_keeps_observer() {
        let leader = Pid::from_raw(200);
        let mut table = table();
        let mut state = TraceeState::default();
        let mut outcomes = Vec::new();

        table.on_thread_start(tag(leader));
        table.on_syscall_event(tag(leader), 59);
        state.in_syscall.insert(leader);

        handle_exec(&mut table, &mut state, &mut outcomes, leader, leader);

        assert!(outcomes.is_empty());
        assert!(table.is_active(tag(leader)));
        assert!(state.in_syscall.contains(&leader));
        assert_eq!(table.on_thread_end(tag(leader)).unwrap().total_calls, 1);
    }

    #[test]
    fn test_exec_args_rejects_nul() {
        let err = exec_args(&["bad\0arg".to_string()]).unwrap_err();
        assert!(err.to_string().contains("NUL"));

        let argv = exec_args(&["echo".to_string(), "hi".to_string()]).unwrap();
        assert_eq!(argv[0].as_bytes(), b"echo");
        assert_eq!(argv.len(), 2);
    }
}
