use crate::core::models::{ProcessRecord, ProcessState};
use crate::core::snapshot::{Probe, ProcessSource};
use crate::dispatch::{SignalFailure, SignalKind, SignalSender};
use crate::error::{errors, ProcTreeResult};
use crate::safety::CommandNameLookup;
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use psutil::process::{Process, ProcessError, Status};
use std::time::Duration;
use tracing::{debug, trace};

/// Reads process metadata through psutil (procfs on Linux).
pub struct PsutilSource {
    boot_time: DateTime<Utc>,
    ticks_per_second: u64,
}

impl PsutilSource {
    pub fn new() -> ProcTreeResult<Self> {
        let boot_time = psutil::host::boot_time()
            .map_err(|e| errors::enumeration_error_with_source("Cannot read system boot time", e))?;
        Ok(Self {
            boot_time: DateTime::<Utc>::from(boot_time),
            ticks_per_second: clock_ticks_per_second(),
        })
    }

    fn ticks(&self, duration: Duration) -> u64 {
        let ticks = duration.as_nanos() * u128::from(self.ticks_per_second) / 1_000_000_000;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn read(&self, pid: u32) -> Result<ProcessRecord, ProcessError> {
        let process = Process::new(pid)?;

        // Pid 1 and kernel threads report no parent
        let parent_pid = process.ppid()?.unwrap_or(0);
        let command_name = process.name()?;
        let state = process.status().map(state_from_status)?;
        let since_boot = process.create_time();

        // Memory and CPU of other users' processes may be unreadable
        let resident_memory = match process.memory_info() {
            Ok(info) => info.rss(),
            Err(ProcessError::AccessDenied { .. }) => 0,
            Err(e) => return Err(e),
        };
        let cpu_time = match process.cpu_times() {
            Ok(times) => self.ticks(times.user() + times.system()),
            Err(ProcessError::AccessDenied { .. }) => 0,
            Err(e) => return Err(e),
        };

        let creation_timestamp = chrono::Duration::from_std(since_boot)
            .map(|elapsed| self.boot_time + elapsed)
            .unwrap_or(self.boot_time);

        Ok(ProcessRecord::new(pid, parent_pid)
            .with_start_order_key(self.ticks(since_boot))
            .with_resident_memory(resident_memory)
            .with_cpu_time(cpu_time)
            .with_state(state)
            .with_creation_timestamp(creation_timestamp)
            .with_command_name(command_name))
    }
}

impl ProcessSource for PsutilSource {
    fn pids(&self) -> ProcTreeResult<Vec<u32>> {
        psutil::process::pids()
            .map_err(|e| errors::enumeration_error_with_source("Cannot enumerate processes", e))
    }

    fn probe(&self, pid: u32) -> Probe {
        match self.read(pid) {
            Ok(record) => Probe::Found(record),
            Err(ProcessError::NoSuchProcess { .. }) => Probe::Vanished,
            Err(e) => {
                trace!(pid, error = %e, "process unreadable, skipping");
                Probe::Vanished
            }
        }
    }
}

fn state_from_status(status: Status) -> ProcessState {
    match status {
        Status::Running => ProcessState::Running,
        Status::Sleeping => ProcessState::Sleeping,
        Status::DiskSleep => ProcessState::DiskSleep,
        Status::Stopped => ProcessState::Stopped,
        Status::TracingStop => ProcessState::TracingStop,
        Status::Zombie => ProcessState::Zombie,
        Status::Dead => ProcessState::Dead,
        Status::Idle => ProcessState::Idle,
        _ => ProcessState::Unknown,
    }
}

/// Live command-name lookup, read fresh on every call.
pub struct PsutilNames;

impl CommandNameLookup for PsutilNames {
    fn command_name(&self, pid: u32) -> Option<String> {
        Process::new(pid).and_then(|process| process.name()).ok()
    }
}

/// Delivers signals with kill(2).
pub struct NixSignalSender;

impl SignalSender for NixSignalSender {
    fn send(&self, pid: u32, kind: SignalKind) -> Result<(), SignalFailure> {
        let raw = i32::try_from(pid).map_err(|_| SignalFailure::NoSuchProcess)?;
        let signal = match kind {
            SignalKind::Terminate => Signal::SIGKILL,
            SignalKind::Stop => Signal::SIGSTOP,
            SignalKind::Resume => Signal::SIGCONT,
        };

        match kill(Pid::from_raw(raw), signal) {
            Ok(()) => {
                debug!(pid, ?signal, "kill(2) succeeded");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(SignalFailure::NoSuchProcess),
            Err(Errno::EPERM) => Err(SignalFailure::PermissionDenied),
            Err(errno) => Err(SignalFailure::Other(errno.desc().to_string())),
        }
    }
}

/// Kernel clock ticks per second
///
/// Encapsulates unsafe sysconf call
fn clock_ticks_per_second() -> u64 {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        100
    }
}
