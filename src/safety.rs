//! Signal safety policy
//!
//! Decides, immediately before each signal, whether a pid may be touched.
//! Init is never signalled. Interactive shells are recognised by a live
//! command-name lookup rather than the snapshot, whose names may be stale
//! by the time a batch reaches them.

use crate::config::INIT_PID;
use crate::utils::config_paths::Settings;
use serde::Serialize;
use tracing::info;

/// Live command-name lookup for a pid.
pub trait CommandNameLookup {
    /// `None` when the process no longer exists or cannot be read.
    fn command_name(&self, pid: u32) -> Option<String>;
}

impl<T: CommandNameLookup + ?Sized> CommandNameLookup for &T {
    fn command_name(&self, pid: u32) -> Option<String> {
        (**self).command_name(pid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    RefusedInit,
    RefusedShell { command_name: String },
    /// The live lookup found nothing; the process is already gone.
    Vanished,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    /// Protective notice printed for a refused pid.
    pub fn notice(&self, pid: u32) -> Option<String> {
        match self {
            Verdict::RefusedInit => Some(format!(
                "{pid} is a INIT process and will not be terminated"
            )),
            Verdict::RefusedShell { .. } => {
                Some(format!("{pid} is BASH process and will not be terminated"))
            }
            Verdict::Allowed | Verdict::Vanished => None,
        }
    }
}

pub struct SafetyPolicy<L> {
    lookup: L,
    shell_markers: Vec<String>,
}

impl<L: CommandNameLookup> SafetyPolicy<L> {
    pub fn new(lookup: L, settings: &Settings) -> Self {
        Self {
            lookup,
            shell_markers: settings.protected_shell_markers.clone(),
        }
    }

    pub fn shell_markers(&self) -> &[String] {
        &self.shell_markers
    }

    pub fn check(&self, pid: u32) -> Verdict {
        if pid == INIT_PID {
            info!(pid, "refusing to signal init");
            return Verdict::RefusedInit;
        }

        let Some(command_name) = self.lookup.command_name(pid) else {
            return Verdict::Vanished;
        };

        if self
            .shell_markers
            .iter()
            .any(|marker| command_name.contains(marker.as_str()))
        {
            info!(pid, %command_name, "refusing to signal protected shell");
            return Verdict::RefusedShell { command_name };
        }

        Verdict::Allowed
    }

    pub fn may_signal(&self, pid: u32) -> bool {
        self.check(pid).is_allowed()
    }
}
