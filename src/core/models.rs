//! Snapshot data model
//!
//! `ProcessRecord` is one process as observed during a scan. `ProcessSnapshot`
//! is the ordered, pid-indexed store produced by one scan pass.

use crate::config::{COMMAND_NAME_MAX_LEN, INITIAL_SNAPSHOT_CAPACITY};
use crate::error::{ProcTreeError, ProcTreeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scheduler state as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Sleeping,
    DiskSleep,
    Stopped,
    TracingStop,
    Zombie,
    Dead,
    Idle,
    Unknown,
}

impl ProcessState {
    /// Map the single-letter code from `/proc/<pid>/stat`.
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'T' => ProcessState::Stopped,
            't' => ProcessState::TracingStop,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            'I' => ProcessState::Idle,
            _ => ProcessState::Unknown,
        }
    }

    pub fn code(&self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::DiskSleep => 'D',
            ProcessState::Stopped => 'T',
            ProcessState::TracingStop => 't',
            ProcessState::Zombie => 'Z',
            ProcessState::Dead => 'X',
            ProcessState::Idle => 'I',
            ProcessState::Unknown => '?',
        }
    }
}

/// One process observed in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    /// May name a pid absent from the snapshot; 0 means no parent.
    pub parent_pid: u32,
    /// Kernel start time in clock ticks since boot
    pub start_order_key: u64,
    pub resident_memory_bytes: u64,
    /// User plus kernel time in clock ticks
    pub cpu_time_ticks: u64,
    pub state: ProcessState,
    pub creation_timestamp: DateTime<Utc>,
    pub command_name: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, parent_pid: u32) -> Self {
        Self {
            pid,
            parent_pid,
            start_order_key: 0,
            resident_memory_bytes: 0,
            cpu_time_ticks: 0,
            state: ProcessState::Sleeping,
            creation_timestamp: DateTime::<Utc>::default(),
            command_name: String::new(),
        }
    }

    pub fn with_start_order_key(mut self, key: u64) -> Self {
        self.start_order_key = key;
        self
    }

    pub fn with_resident_memory(mut self, bytes: u64) -> Self {
        self.resident_memory_bytes = bytes;
        self
    }

    pub fn with_cpu_time(mut self, ticks: u64) -> Self {
        self.cpu_time_ticks = ticks;
        self
    }

    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = state;
        self
    }

    pub fn with_creation_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.creation_timestamp = at;
        self
    }

    pub fn with_command_name(mut self, name: impl AsRef<str>) -> Self {
        self.command_name = truncate_command_name(name.as_ref());
        self
    }

    /// Ordering key for oldest/newest comparisons, ties broken by pid.
    pub fn age_key(&self) -> (u64, u32) {
        (self.start_order_key, self.pid)
    }
}

/// Clip to the kernel's comm length without splitting a UTF-8 sequence.
pub fn truncate_command_name(name: &str) -> String {
    if name.len() <= COMMAND_NAME_MAX_LEN {
        return name.to_string();
    }
    let mut end = COMMAND_NAME_MAX_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Point-in-time capture of every observable process.
///
/// Records keep discovery order; `index` maps pid to position. Pids are
/// unique: inserting a pid twice replaces the earlier record in place.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    records: Vec<ProcessRecord>,
    index: HashMap<u32, usize>,
    captured_at: DateTime<Utc>,
}

impl ProcessSnapshot {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            captured_at,
        }
    }

    /// Pre-size storage for a scan.
    pub fn with_capacity(captured_at: DateTime<Utc>, capacity: usize) -> ProcTreeResult<Self> {
        let mut snapshot = Self::new(captured_at);
        snapshot.reserve(capacity)?;
        Ok(snapshot)
    }

    /// Build directly from records, mainly for fixtures.
    pub fn from_records(records: impl IntoIterator<Item = ProcessRecord>) -> ProcTreeResult<Self> {
        let mut snapshot = Self::new(Utc::now());
        for record in records {
            snapshot.insert(record)?;
        }
        Ok(snapshot)
    }

    /// Append a record, doubling capacity when full. Existing records are
    /// never lost on growth.
    pub fn insert(&mut self, record: ProcessRecord) -> ProcTreeResult<()> {
        if let Some(&slot) = self.index.get(&record.pid) {
            self.records[slot] = record;
            return Ok(());
        }
        if self.records.len() == self.records.capacity() {
            let grow_by = self.records.capacity().max(INITIAL_SNAPSHOT_CAPACITY);
            self.reserve(grow_by)?;
        }
        self.index.insert(record.pid, self.records.len());
        self.records.push(record);
        Ok(())
    }

    fn reserve(&mut self, additional: usize) -> ProcTreeResult<()> {
        self.records
            .try_reserve_exact(additional)
            .map_err(|source| ProcTreeError::Allocation {
                what: "process snapshot",
                source,
            })?;
        self.index
            .try_reserve(additional)
            .map_err(|source| ProcTreeError::Allocation {
                what: "process index",
                source,
            })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ProcessRecord> {
        self.records.get(index)
    }

    pub fn index_of(&self, pid: u32) -> Option<usize> {
        self.index.get(&pid).copied()
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.index_of(pid).map(|slot| &self.records[slot])
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.index.contains_key(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_keeps_discovery_order() {
        let snapshot = ProcessSnapshot::from_records([
            ProcessRecord::new(10, 1),
            ProcessRecord::new(3, 1),
            ProcessRecord::new(7, 3),
        ])
        .expect("snapshot");

        let pids: Vec<u32> = snapshot.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![10, 3, 7]);
        assert_eq!(snapshot.index_of(7), Some(2));
        assert_eq!(snapshot.get(3).map(|r| r.parent_pid), Some(1));
        assert!(snapshot.get(99).is_none());
    }

    #[test]
    fn duplicate_pid_replaces_in_place() {
        let snapshot = ProcessSnapshot::from_records([
            ProcessRecord::new(10, 1),
            ProcessRecord::new(11, 1),
            ProcessRecord::new(10, 11),
        ])
        .expect("snapshot");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.index_of(10), Some(0));
        assert_eq!(snapshot.get(10).map(|r| r.parent_pid), Some(11));
    }

    #[test]
    fn growth_past_initial_capacity_loses_nothing() {
        let total = INITIAL_SNAPSHOT_CAPACITY * 2 + 17;
        let snapshot = ProcessSnapshot::from_records(
            (1..=total as u32).map(|pid| ProcessRecord::new(pid, pid.saturating_sub(1))),
        )
        .expect("snapshot");

        assert_eq!(snapshot.len(), total);
        for pid in 1..=total as u32 {
            assert_eq!(snapshot.get(pid).map(|r| r.pid), Some(pid));
        }
    }

    #[test]
    fn command_name_is_truncated_on_char_boundary() {
        let record = ProcessRecord::new(5, 1).with_command_name("a-very-long-command-name");
        assert_eq!(record.command_name, "a-very-long-com");

        let multibyte = truncate_command_name("ééééééééé");
        assert!(multibyte.len() <= COMMAND_NAME_MAX_LEN);
        assert_eq!(multibyte, "ééééééé");
    }

    #[test]
    fn state_codes_round_trip_for_known_states() {
        for code in ['R', 'S', 'D', 'T', 't', 'Z', 'X', 'I'] {
            assert_eq!(ProcessState::from_code(code).code(), code);
        }
        assert_eq!(ProcessState::from_code('W'), ProcessState::Unknown);
    }
}
