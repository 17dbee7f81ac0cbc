//! Process table access: listing live processes and signalling them.
//!
//! [`SystemProcessTable`] reads `/proc` and uses `kill(2)`/`setpriority(2)`
//! on Unix. [`MockProcessTable`] records every call instead of touching the
//! system, so runner behavior can be exercised without live processes.

use std::io;
use std::sync::Mutex;

use tracing::debug;

/// Names that process-family actions must never touch.
pub const ESSENTIAL_PROCESSES: [&str; 6] = ["init", "systemd", "kernel", "kthreadd", "sshd", "login"];

/// Whether `target` names a protected process (case-insensitive exact match).
pub fn is_essential(target: &str) -> bool {
    let target = target.trim();
    ESSENTIAL_PROCESSES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(target))
}

/// Whether the platform has a stop/continue signal pair.
///
/// Without one, suspend degrades to terminate and cannot be undone.
pub const fn pause_resume_supported() -> bool {
    cfg!(unix)
}

/// Signals the runners send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Stop,
    Continue,
}

impl Signal {
    /// The signal actually delivered for a suspend request on this platform.
    pub fn for_suspend() -> Signal {
        if pause_resume_supported() {
            Signal::Stop
        } else {
            Signal::Terminate
        }
    }

    /// The signal delivered to resume; `None` where resume is impossible.
    pub fn for_resume() -> Option<Signal> {
        pause_resume_supported().then_some(Signal::Continue)
    }

    #[cfg(unix)]
    fn raw(self) -> libc::c_int {
        match self {
            Signal::Terminate => libc::SIGTERM,
            Signal::Stop => libc::SIGSTOP,
            Signal::Continue => libc::SIGCONT,
        }
    }
}

/// A snapshot of one live process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cmdline: Vec<String>,
    pub rss_bytes: u64,
}

impl ProcessInfo {
    pub fn rss_mb(&self) -> f64 {
        self.rss_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Case-insensitive substring match on the name or any argv element.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .cmdline
                .iter()
                .any(|arg| arg.to_lowercase().contains(&needle))
    }
}

/// Access to the live process table.
pub trait ProcessTable: Send + Sync {
    fn list(&self) -> Vec<ProcessInfo>;

    fn signal(&self, pid: u32, signal: Signal) -> io::Result<()>;

    fn renice(&self, pid: u32, niceness: i32) -> io::Result<()>;

    /// Pids whose name or command line contains `needle`, never an
    /// essential process.
    fn find_pids(&self, needle: &str) -> Vec<u32> {
        self.list()
            .into_iter()
            .filter(|p| p.matches(needle) && !is_essential(&p.name))
            .map(|p| p.pid)
            .collect()
    }
}

/// The real process table of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
fn read_proc_entry(pid: u32) -> Option<ProcessInfo> {
    let base = std::path::Path::new("/proc").join(pid.to_string());
    let name = std::fs::read_to_string(base.join("comm"))
        .ok()?
        .trim()
        .to_string();
    let cmdline = std::fs::read(base.join("cmdline"))
        .map(|raw| {
            raw.split(|b| *b == 0)
                .filter(|part| !part.is_empty())
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect()
        })
        .unwrap_or_default();
    let rss_kb = std::fs::read_to_string(base.join("status"))
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok())
        })
        .unwrap_or(0);
    Some(ProcessInfo {
        pid,
        name,
        cmdline,
        rss_bytes: rss_kb * 1024,
    })
}

impl ProcessTable for SystemProcessTable {
    #[cfg(target_os = "linux")]
    fn list(&self) -> Vec<ProcessInfo> {
        let own_pid = std::process::id();
        let entries = match std::fs::read_dir("/proc") {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "Cannot read /proc");
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            // Our own argv usually contains the target name.
            .filter(|pid| *pid != own_pid)
            .filter_map(read_proc_entry)
            .collect()
    }

    #[cfg(not(target_os = "linux"))]
    fn list(&self) -> Vec<ProcessInfo> {
        debug!("Process listing is only implemented for Linux");
        Vec::new()
    }

    #[cfg(unix)]
    fn signal(&self, pid: u32, signal: Signal) -> io::Result<()> {
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid, signal.raw()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, _pid: u32, _signal: Signal) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process signalling is not supported on this platform",
        ))
    }

    #[cfg(unix)]
    fn renice(&self, pid: u32, niceness: i32) -> io::Result<()> {
        // SAFETY: setpriority(2) has no memory-safety preconditions.
        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, niceness) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn renice(&self, _pid: u32, _niceness: i32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "renice is not supported on this platform",
        ))
    }
}

/// A call observed by [`MockProcessTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessCall {
    Signal(u32, Signal),
    Renice(u32, i32),
}

/// In-memory process table for tests and dry experiments.
#[derive(Default)]
pub struct MockProcessTable {
    processes: Mutex<Vec<ProcessInfo>>,
    calls: Mutex<Vec<ProcessCall>>,
    denied: Mutex<Vec<u32>>,
}

impl MockProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, name: &str, rss_mb: u64) -> Self {
        self.add_process(pid, name, rss_mb);
        self
    }

    pub fn add_process(&self, pid: u32, name: &str, rss_mb: u64) {
        if let Ok(mut procs) = self.processes.lock() {
            procs.push(ProcessInfo {
                pid,
                name: name.to_string(),
                cmdline: vec![format!("/usr/bin/{}", name)],
                rss_bytes: rss_mb * 1024 * 1024,
            });
        }
    }

    /// Replace the whole table, e.g. to simulate restarts between calls.
    pub fn replace_processes(&self, processes: Vec<ProcessInfo>) {
        if let Ok(mut procs) = self.processes.lock() {
            *procs = processes;
        }
    }

    /// Make every call for `pid` fail with permission denied.
    pub fn deny(&self, pid: u32) {
        if let Ok(mut denied) = self.denied.lock() {
            denied.push(pid);
        }
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, pid: u32, call: ProcessCall) -> io::Result<()> {
        let denied = self.denied.lock().map(|d| d.contains(&pid)).unwrap_or(false);
        if denied {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Operation not permitted",
            ));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(())
    }
}

impl ProcessTable for MockProcessTable {
    fn list(&self) -> Vec<ProcessInfo> {
        self.processes.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn signal(&self, pid: u32, signal: Signal) -> io::Result<()> {
        self.record(pid, ProcessCall::Signal(pid, signal))
    }

    fn renice(&self, pid: u32, niceness: i32) -> io::Result<()> {
        self.record(pid, ProcessCall::Renice(pid, niceness))
    }
}
