//! Syscall number to name mapping
//!
//! Used only for display. Ids are tallied and validated as raw numbers, so an
//! id missing from these tables is still counted and compared.

/// Syscall numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Numbering scheme of the build target (x86_64 unless built for aarch64)
    pub fn native() -> Self {
        if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else {
            Arch::X86_64
        }
    }
}

/// Resolve a syscall number to its name for `arch`
pub fn syscall_name(arch: Arch, num: u64) -> Option<&'static str> {
    match arch {
        Arch::X86_64 => x86_64_name(num),
        Arch::Aarch64 => aarch64_name(num),
    }
}

/// Display label: `name` if known, otherwise `syscall_NNN`
pub fn display_name(arch: Arch, num: u64) -> String {
    syscall_name(arch, num)
        .map(str::to_string)
        .unwrap_or_else(|| format!("syscall_{}", num))
}

fn x86_64_name(num: u64) -> Option<&'static str> {
    let name = match num {
        0 => "read",
        1 => "write",
        2 => "open",
        3 => "close",
        4 => "stat",
        5 => "fstat",
        6 => "lstat",
        7 => "poll",
        8 => "lseek",
        9 => "mmap",
        10 => "mprotect",
        11 => "munmap",
        12 => "brk",
        13 => "rt_sigaction",
        14 => "rt_sigprocmask",
        15 => "rt_sigreturn",
        16 => "ioctl",
        17 => "pread64",
        18 => "pwrite64",
        19 => "readv",
        20 => "writev",
        21 => "access",
        22 => "pipe",
        23 => "select",
        24 => "sched_yield",
        25 => "mremap",
        28 => "madvise",
        32 => "dup",
        33 => "dup2",
        35 => "nanosleep",
        39 => "getpid",
        41 => "socket",
        42 => "connect",
        43 => "accept",
        44 => "sendto",
        45 => "recvfrom",
        49 => "bind",
        50 => "listen",
        56 => "clone",
        57 => "fork",
        58 => "vfork",
        59 => "execve",
        60 => "exit",
        61 => "wait4",
        62 => "kill",
        63 => "uname",
        72 => "fcntl",
        79 => "getcwd",
        80 => "chdir",
        83 => "mkdir",
        87 => "unlink",
        89 => "readlink",
        102 => "getuid",
        104 => "getgid",
        107 => "geteuid",
        108 => "getegid",
        110 => "getppid",
        131 => "sigaltstack",
        157 => "prctl",
        158 => "arch_prctl",
        186 => "gettid",
        202 => "futex",
        217 => "getdents64",
        218 => "set_tid_address",
        228 => "clock_gettime",
        230 => "clock_nanosleep",
        231 => "exit_group",
        234 => "tgkill",
        257 => "openat",
        262 => "newfstatat",
        273 => "set_robust_list",
        293 => "pipe2",
        302 => "prlimit64",
        318 => "getrandom",
        332 => "statx",
        334 => "rseq",
        435 => "clone3",
        _ => return None,
    };
    Some(name)
}

fn aarch64_name(num: u64) -> Option<&'static str> {
    let name = match num {
        17 => "getcwd",
        23 => "dup",
        24 => "dup3",
        25 => "fcntl",
        29 => "ioctl",
        34 => "mkdirat",
        35 => "unlinkat",
        48 => "faccessat",
        49 => "chdir",
        56 => "openat",
        57 => "close",
        59 => "pipe2",
        61 => "getdents64",
        62 => "lseek",
        63 => "read",
        64 => "write",
        65 => "readv",
        66 => "writev",
        67 => "pread64",
        68 => "pwrite64",
        78 => "readlinkat",
        79 => "newfstatat",
        80 => "fstat",
        93 => "exit",
        94 => "exit_group",
        96 => "set_tid_address",
        98 => "futex",
        99 => "set_robust_list",
        101 => "nanosleep",
        113 => "clock_gettime",
        115 => "clock_nanosleep",
        124 => "sched_yield",
        129 => "kill",
        131 => "tgkill",
        132 => "sigaltstack",
        134 => "rt_sigaction",
        135 => "rt_sigprocmask",
        139 => "rt_sigreturn",
        160 => "uname",
        167 => "prctl",
        172 => "getpid",
        173 => "getppid",
        174 => "getuid",
        175 => "geteuid",
        176 => "getgid",
        177 => "getegid",
        178 => "gettid",
        198 => "socket",
        200 => "bind",
        201 => "listen",
        202 => "accept",
        203 => "connect",
        206 => "sendto",
        207 => "recvfrom",
        214 => "brk",
        215 => "munmap",
        216 => "mremap",
        220 => "clone",
        221 => "execve",
        222 => "mmap",
        226 => "mprotect",
        233 => "madvise",
        260 => "wait4",
        261 => "prlimit64",
        278 => "getrandom",
        291 => "statx",
        293 => "rseq",
        435 => "clone3",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_x86_64_syscalls() {
        assert_eq!(syscall_name(Arch::X86_64, 0), Some("read"));
        assert_eq!(syscall_name(Arch::X86_64, 1), Some("write"));
        assert_eq!(syscall_name(Arch::X86_64, 60), Some("exit"));
        assert_eq!(syscall_name(Arch::X86_64, 257), Some("openat"));
    }

    #[test]
    fn test_common_aarch64_syscalls() {
        assert_eq!(syscall_name(Arch::Aarch64, 63), Some("read"));
        assert_eq!(syscall_name(Arch::Aarch64, 64), Some("write"));
        assert_eq!(syscall_name(Arch::Aarch64, 222), Some("mmap"));
        assert_eq!(syscall_name(Arch::Aarch64, 93), Some("exit"));
    }

    #[test]
    fn test_unknown_syscall() {
        assert_eq!(syscall_name(Arch::X86_64, 9999), None);
        assert_eq!(display_name(Arch::X86_64, 9999), "syscall_9999");
        assert_eq!(display_name(Arch::Aarch64, 64), "write");
    }
}
