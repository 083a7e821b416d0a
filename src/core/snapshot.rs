//! Snapshot builder
//!
//! Walks every pid the metadata source can see and captures one record per
//! live process. Processes that exit between enumeration and probing are
//! skipped; that race is expected and not an error.

use crate::config::INITIAL_SNAPSHOT_CAPACITY;
use crate::core::models::{ProcessRecord, ProcessSnapshot};
use crate::error::ProcTreeResult;
use chrono::Utc;
use tracing::{debug, trace};

/// Result of probing a single pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(ProcessRecord),
    /// The process exited (or became unreadable) after enumeration.
    Vanished,
}

/// Source of raw per-process metadata.
pub trait ProcessSource {
    /// Every pid currently observable.
    fn pids(&self) -> ProcTreeResult<Vec<u32>>;

    /// Read one process's metadata.
    fn probe(&self, pid: u32) -> Probe;
}

impl<T: ProcessSource + ?Sized> ProcessSource for &T {
    fn pids(&self) -> ProcTreeResult<Vec<u32>> {
        (**self).pids()
    }

    fn probe(&self, pid: u32) -> Probe {
        (**self).probe(pid)
    }
}

pub struct SnapshotBuilder<S> {
    source: S,
}

impl<S: ProcessSource> SnapshotBuilder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn build(&self) -> ProcTreeResult<ProcessSnapshot> {
        let captured_at = Utc::now();
        let pids = self.source.pids()?;
        let mut snapshot = ProcessSnapshot::with_capacity(captured_at, INITIAL_SNAPSHOT_CAPACITY)?;
        let mut vanished = 0usize;

        for pid in pids {
            if pid == 0 {
                continue;
            }
            match self.source.probe(pid) {
                Probe::Found(record) => snapshot.insert(record)?,
                Probe::Vanished => {
                    trace!(pid, "process vanished during scan");
                    vanished += 1;
                }
            }
        }

        debug!(
            records = snapshot.len(),
            vanished, "process snapshot captured"
        );
        Ok(snapshot)
    }
}

/// Build a snapshot from `source` in one call.
pub fn build_snapshot<S: ProcessSource>(source: S) -> ProcTreeResult<ProcessSnapshot> {
    SnapshotBuilder::new(source).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::errors::enumeration_error;
    use crate::error::ProcTreeError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct FixtureSource {
        listed: Vec<u32>,
        live: HashMap<u32, ProcessRecord>,
    }

    impl ProcessSource for FixtureSource {
        fn pids(&self) -> ProcTreeResult<Vec<u32>> {
            Ok(self.listed.clone())
        }

        fn probe(&self, pid: u32) -> Probe {
            self.live
                .get(&pid)
                .cloned()
                .map(Probe::Found)
                .unwrap_or(Probe::Vanished)
        }
    }

    struct BrokenSource;

    impl ProcessSource for BrokenSource {
        fn pids(&self) -> ProcTreeResult<Vec<u32>> {
            Err(enumeration_error("/proc is not mounted"))
        }

        fn probe(&self, _pid: u32) -> Probe {
            Probe::Vanished
        }
    }

    #[test]
    fn vanished_processes_are_skipped() {
        let live = [1, 20, 30]
            .into_iter()
            .map(|pid| (pid, ProcessRecord::new(pid, 1)))
            .collect();
        let source = FixtureSource {
            listed: vec![1, 20, 25, 30],
            live,
        };

        let snapshot = build_snapshot(&source).expect("snapshot");
        let pids: Vec<u32> = snapshot.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![1, 20, 30]);
        assert!(!snapshot.contains(25));
    }

    #[test]
    fn repeated_pid_keeps_one_record() {
        let live = [(7, ProcessRecord::new(7, 1))].into_iter().collect();
        let source = FixtureSource {
            listed: vec![7, 7, 0],
            live,
        };

        let snapshot = build_snapshot(source).expect("snapshot");
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn enumeration_failure_is_reported() {
        let err = build_snapshot(BrokenSource).expect_err("scan should fail");
        assert!(matches!(err, ProcTreeError::Enumeration { .. }));
    }
}
