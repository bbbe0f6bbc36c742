//! Process-supervisor orchestration platform
//!
//! Manages local trading daemons through pid files in a run directory
//! (`<run_dir>/<service>.pid`). Capacity maps onto process execution
//! state: a SIGSTOP'd process has capacity 0, a live one capacity 1.
//! Reload requests are delivered as SIGUSR1, the signal the managed
//! services install a reload handler for. Execution state comes from
//! `/proc/<pid>/stat`, so this platform targets Linux hosts.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::orchestrator::platform::{ServiceDescriptor, ServicePlatform, ServiceState};

/// Platform implementation over pid files and Unix signals
pub struct ProcessPlatform {
    run_dir: PathBuf,
}

impl ProcessPlatform {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    fn pid_file(&self, name: &str) -> PathBuf {
        self.run_dir.join(format!("{}.pid", name))
    }

    fn read_pid(&self, name: &str) -> Result<i32, PlatformError> {
        let pid_file = self.pid_file(name);
        if !pid_file.exists() {
            return Err(PlatformError::NotFound(name.to_string()));
        }
        fs::read_to_string(&pid_file)?
            .trim()
            .parse()
            .map_err(|_| PlatformError::InvalidPidFile(name.to_string()))
    }

    /// Execution state of a pid read from /proc; `T` (stopped) maps to
    /// capacity 0, any other live state to capacity 1.
    fn process_state(&self, name: &str, pid: i32) -> Result<ServiceState, PlatformError> {
        let stat = match fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Stale pid file: the process is gone
                let _ = fs::remove_file(self.pid_file(name));
                return Err(PlatformError::NotFound(name.to_string()));
            }
            Err(e) => return Err(PlatformError::Io(e)),
        };

        // State char is the first field after the parenthesized comm,
        // which may itself contain spaces
        let state_char = stat
            .rfind(')')
            .and_then(|i| stat[i + 1..].split_whitespace().next())
            .and_then(|s| s.chars().next());

        match state_char {
            Some('T') | Some('t') => Ok(ServiceState::Paused),
            Some('Z') | Some('X') => Err(PlatformError::NotFound(name.to_string())),
            Some(_) => Ok(ServiceState::Running),
            None => Ok(ServiceState::Unknown),
        }
    }

    #[cfg(unix)]
    fn send_signal(&self, name: &str, pid: i32, signal: nix::sys::signal::Signal) -> Result<(), PlatformError> {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid), signal)
            .map_err(|e| PlatformError::Signal(format!("{} to {} (pid {}): {}", signal, name, pid, e)))
    }
}

#[async_trait]
impl ServicePlatform for ProcessPlatform {
    async fn discover(&self, selector: &str) -> Result<Vec<ServiceDescriptor>, PlatformError> {
        let entries = match fs::read_dir(&self.run_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PlatformError::Io(e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pid") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !name.contains(selector) {
                continue;
            }

            let descriptor = match self
                .read_pid(name)
                .and_then(|pid| self.process_state(name, pid))
            {
                Ok(ServiceState::Running) => ServiceDescriptor::new(name, 1, ServiceState::Running),
                Ok(ServiceState::Paused) => ServiceDescriptor::new(name, 0, ServiceState::Paused),
                Ok(ServiceState::Unknown) | Err(_) => {
                    ServiceDescriptor::new(name, 0, ServiceState::Unknown)
                }
            };
            found.push(descriptor);
        }

        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn get_capacity(&self, name: &str) -> Result<u32, PlatformError> {
        let pid = self.read_pid(name)?;
        match self.process_state(name, pid)? {
            ServiceState::Running => Ok(1),
            ServiceState::Paused => Ok(0),
            ServiceState::Unknown => Ok(0),
        }
    }

    #[cfg(unix)]
    async fn set_capacity(&self, name: &str, capacity: u32) -> Result<(), PlatformError> {
        use nix::sys::signal::Signal;

        let pid = self.read_pid(name)?;
        // Confirm the process still exists before signaling
        self.process_state(name, pid)?;

        let signal = if capacity == 0 {
            Signal::SIGSTOP
        } else {
            Signal::SIGCONT
        };
        self.send_signal(name, pid, signal)
    }

    #[cfg(not(unix))]
    async fn set_capacity(&self, _name: &str, _capacity: u32) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(
            "process signaling requires a unix platform".to_string(),
        ))
    }

    #[cfg(unix)]
    async fn signal_reload(&self, name: &str) -> Result<(), PlatformError> {
        use nix::sys::signal::Signal;

        let pid = self.read_pid(name)?;
        self.send_signal(name, pid, Signal::SIGUSR1)
    }

    #[cfg(not(unix))]
    async fn signal_reload(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported(
            "process signaling requires a unix platform".to_string(),
        ))
    }
}
