//! Structural and resource queries over a subtree
//!
//! Every query is relative to a `(root, target)` pair. The engine first
//! confirms `target` sits inside the subtree rooted at `root` and does no
//! further work when it does not.

use crate::core::models::{ProcessRecord, ProcessSnapshot};
use crate::core::process_tree::{
    collect_descendants, depth, direct_children, has_shell_ancestry, is_in_subtree, parent_of,
};
use crate::error::{ProcTreeError, ProcTreeResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Report the target and its parent once membership is confirmed.
    Membership,
    Depth,
    SameLevel,
    DescendantCount,
    OldestDescendant,
    NewestDescendant,
    NonDirectCount,
    MostMemory,
    MostCpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    ResidentMemory,
    CpuTime,
}

impl Resource {
    fn value_of(&self, record: &ProcessRecord) -> u64 {
        match self {
            Resource::ResidentMemory => record.resident_memory_bytes,
            Resource::CpuTime => record.cpu_time_ticks,
        }
    }
}

/// Whole-system population selected by shell ancestry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellScope {
    WithShellAncestor,
    WithoutShellAncestor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescendantInfo {
    pub pid: u32,
    pub start_order_key: u64,
    pub creation_timestamp: DateTime<Utc>,
}

impl From<&ProcessRecord> for DescendantInfo {
    fn from(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid,
            start_order_key: record.start_order_key,
            creation_timestamp: record.creation_timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutcome {
    Membership {
        pid: u32,
        parent_pid: Option<u32>,
    },
    Depth {
        target: u32,
        /// `None` when root is unreachable from target.
        depth: Option<usize>,
    },
    SameLevel {
        target: u32,
        count: usize,
    },
    DescendantCount {
        target: u32,
        count: usize,
    },
    OldestDescendant {
        target: u32,
        descendant: DescendantInfo,
    },
    NewestDescendant {
        target: u32,
        descendant: DescendantInfo,
    },
    NonDirectCount {
        target: u32,
        count: usize,
    },
    ResourceMaximum {
        target: u32,
        resource: Resource,
        value: u64,
        pids: Vec<u32>,
    },
    NoDescendants {
        target: u32,
    },
    SystemCount {
        scope: ShellScope,
        count: usize,
    },
}

pub struct QueryEngine<'a> {
    snapshot: &'a ProcessSnapshot,
}

impl<'a> QueryEngine<'a> {
    pub fn new(snapshot: &'a ProcessSnapshot) -> Self {
        Self { snapshot }
    }

    /// Run `query` for `target` within the subtree rooted at `root`.
    pub fn run(&self, query: Query, root: u32, target: u32) -> ProcTreeResult<QueryOutcome> {
        if !is_in_subtree(self.snapshot, root, target) {
            return Err(ProcTreeError::NotInSubtree { target, root });
        }
        debug!(?query, root, target, "running subtree query");

        let outcome = match query {
            Query::Membership => QueryOutcome::Membership {
                pid: target,
                parent_pid: parent_of(self.snapshot, target),
            },
            Query::Depth => QueryOutcome::Depth {
                target,
                depth: depth(self.snapshot, root, target),
            },
            Query::SameLevel => QueryOutcome::SameLevel {
                target,
                count: self.same_level_count(root, target),
            },
            Query::DescendantCount => QueryOutcome::DescendantCount {
                target,
                count: collect_descendants(self.snapshot, target, true).len(),
            },
            Query::OldestDescendant => self
                .oldest_descendant(target)
                .map(|descendant| QueryOutcome::OldestDescendant { target, descendant })
                .unwrap_or(QueryOutcome::NoDescendants { target }),
            Query::NewestDescendant => self
                .newest_descendant(target)
                .map(|descendant| QueryOutcome::NewestDescendant { target, descendant })
                .unwrap_or(QueryOutcome::NoDescendants { target }),
            Query::NonDirectCount => QueryOutcome::NonDirectCount {
                target,
                count: self.non_direct_count(target),
            },
            Query::MostMemory => self.resource_maximum(target, Resource::ResidentMemory),
            Query::MostCpu => self.resource_maximum(target, Resource::CpuTime),
        };
        Ok(outcome)
    }

    /// Records other than `root` sitting at the same depth as `target`.
    /// The target counts itself.
    pub fn same_level_count(&self, root: u32, target: u32) -> usize {
        let Some(level) = depth(self.snapshot, root, target) else {
            return 0;
        };
        self.snapshot
            .iter()
            .filter(|record| record.pid != root)
            .filter(|record| depth(self.snapshot, root, record.pid) == Some(level))
            .count()
    }

    fn descendants(&self, target: u32) -> impl Iterator<Item = &'a ProcessRecord> {
        let snapshot = self.snapshot;
        collect_descendants(snapshot, target, true)
            .into_iter()
            .map(move |idx| &snapshot.records()[idx])
    }

    /// Lowest start key; equal keys go to the lower pid.
    pub fn oldest_descendant(&self, target: u32) -> Option<DescendantInfo> {
        self.descendants(target)
            .min_by_key(|record| record.age_key())
            .map(DescendantInfo::from)
    }

    /// Highest start key; equal keys go to the lower pid.
    pub fn newest_descendant(&self, target: u32) -> Option<DescendantInfo> {
        self.descendants(target)
            .max_by(|a, b| {
                a.start_order_key
                    .cmp(&b.start_order_key)
                    .then_with(|| b.pid.cmp(&a.pid))
            })
            .map(DescendantInfo::from)
    }

    pub fn non_direct_count(&self, target: u32) -> usize {
        let total = collect_descendants(self.snapshot, target, true).len();
        let direct = direct_children(self.snapshot, target).len();
        total.saturating_sub(direct)
    }

    /// Every member of target's subtree, target included, holding the
    /// largest value of `resource`. Ties are all reported.
    pub fn resource_maximum(&self, target: u32, resource: Resource) -> QueryOutcome {
        if collect_descendants(self.snapshot, target, true).is_empty() {
            return QueryOutcome::NoDescendants { target };
        }

        let members: Vec<&ProcessRecord> = collect_descendants(self.snapshot, target, false)
            .into_iter()
            .map(|idx| &self.snapshot.records()[idx])
            .collect();

        let Some(value) = members.iter().map(|r| resource.value_of(r)).max() else {
            return QueryOutcome::NoDescendants { target };
        };
        let pids = members
            .iter()
            .filter(|record| resource.value_of(record) == value)
            .map(|record| record.pid)
            .collect();

        QueryOutcome::ResourceMaximum {
            target,
            resource,
            value,
            pids,
        }
    }

    /// Count processes by whether any ancestor is a protected shell.
    ///
    /// `exclude_pid` (normally the tool itself) is left out of the shell
    /// count; init and the idle task are left out of the non-shell count.
    pub fn count_by_shell_ancestry(
        &self,
        scope: ShellScope,
        markers: &[String],
        exclude_pid: u32,
    ) -> QueryOutcome {
        let count = self
            .snapshot
            .iter()
            .filter(|record| {
                let shell = has_shell_ancestry(self.snapshot, record.pid, markers);
                match scope {
                    ShellScope::WithShellAncestor => shell && record.pid != exclude_pid,
                    ShellScope::WithoutShellAncestor => !shell && record.pid > 1,
                }
            })
            .count();
        QueryOutcome::SystemCount { scope, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProcessState;
    use pretty_assertions::assert_eq;

    fn engine_for(records: Vec<ProcessRecord>) -> ProcessSnapshot {
        ProcessSnapshot::from_records(records).expect("snapshot")
    }

    #[test]
    fn target_outside_subtree_is_rejected() {
        let snapshot = engine_for(vec![ProcessRecord::new(1, 0), ProcessRecord::new(5, 1)]);
        let engine = QueryEngine::new(&snapshot);

        let err = engine
            .run(Query::DescendantCount, 1, 999)
            .expect_err("999 is not in the snapshot");
        assert!(matches!(
            err,
            ProcTreeError::NotInSubtree {
                target: 999,
                root: 1
            }
        ));
    }

    #[test]
    fn same_level_counts_cousins_but_not_root_or_deeper() {
        // root -> A -> B, root -> C
        let snapshot = engine_for(vec![
            ProcessRecord::new(10, 1),
            ProcessRecord::new(20, 10),
            ProcessRecord::new(21, 20),
            ProcessRecord::new(30, 10),
        ]);
        let engine = QueryEngine::new(&snapshot);

        assert_eq!(
            engine.run(Query::SameLevel, 10, 20).expect("query"),
            QueryOutcome::SameLevel {
                target: 20,
                count: 2
            }
        );
        assert_eq!(engine.same_level_count(10, 10), 0);
        assert_eq!(engine.same_level_count(10, 21), 1);
    }

    #[test]
    fn oldest_and_newest_break_ties_by_pid() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(2, 1),
            ProcessRecord::new(10, 2).with_start_order_key(5),
            ProcessRecord::new(11, 2).with_start_order_key(2),
            ProcessRecord::new(12, 2).with_start_order_key(2),
            ProcessRecord::new(13, 2).with_start_order_key(9),
        ]);
        let engine = QueryEngine::new(&snapshot);

        assert_eq!(engine.oldest_descendant(2).map(|d| d.pid), Some(11));
        assert_eq!(engine.newest_descendant(2).map(|d| d.pid), Some(13));
    }

    #[test]
    fn newest_tie_prefers_lower_pid() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(2, 1),
            ProcessRecord::new(41, 2).with_start_order_key(7),
            ProcessRecord::new(40, 2).with_start_order_key(7),
        ]);
        let engine = QueryEngine::new(&snapshot);
        assert_eq!(engine.newest_descendant(2).map(|d| d.pid), Some(40));
    }

    #[test]
    fn leaf_has_no_descendants() {
        let snapshot = engine_for(vec![ProcessRecord::new(1, 0), ProcessRecord::new(7, 1)]);
        let engine = QueryEngine::new(&snapshot);

        for query in [
            Query::OldestDescendant,
            Query::NewestDescendant,
            Query::MostMemory,
            Query::MostCpu,
        ] {
            assert_eq!(
                engine.run(query, 1, 7).expect("query"),
                QueryOutcome::NoDescendants { target: 7 }
            );
        }
        assert_eq!(
            engine.run(Query::DescendantCount, 1, 7).expect("query"),
            QueryOutcome::DescendantCount {
                target: 7,
                count: 0
            }
        );
    }

    #[test]
    fn non_direct_excludes_children() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(2, 1),
            ProcessRecord::new(3, 2),
            ProcessRecord::new(4, 2),
            ProcessRecord::new(5, 3),
            ProcessRecord::new(6, 5),
        ]);
        let engine = QueryEngine::new(&snapshot);
        assert_eq!(engine.non_direct_count(2), 2);
        assert_eq!(engine.non_direct_count(6), 0);
    }

    #[test]
    fn memory_maximum_lists_every_tie() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(100, 1).with_resident_memory(100),
            ProcessRecord::new(101, 100).with_resident_memory(250),
            ProcessRecord::new(102, 100).with_resident_memory(250),
            ProcessRecord::new(103, 101).with_resident_memory(10),
        ]);
        let engine = QueryEngine::new(&snapshot);

        assert_eq!(
            engine.run(Query::MostMemory, 100, 100).expect("query"),
            QueryOutcome::ResourceMaximum {
                target: 100,
                resource: Resource::ResidentMemory,
                value: 250,
                pids: vec![101, 102],
            }
        );
    }

    #[test]
    fn resource_scan_includes_the_target_itself() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(100, 1).with_cpu_time(900),
            ProcessRecord::new(101, 100).with_cpu_time(40),
            ProcessRecord::new(102, 100).with_cpu_time(900),
        ]);
        let engine = QueryEngine::new(&snapshot);

        assert_eq!(
            engine.resource_maximum(100, Resource::CpuTime),
            QueryOutcome::ResourceMaximum {
                target: 100,
                resource: Resource::CpuTime,
                value: 900,
                pids: vec![100, 102],
            }
        );
    }

    #[test]
    fn shell_ancestry_counts_split_the_system() {
        let snapshot = engine_for(vec![
            ProcessRecord::new(1, 0).with_command_name("init"),
            ProcessRecord::new(2, 0).with_command_name("kthreadd"),
            ProcessRecord::new(40, 1).with_command_name("bash"),
            ProcessRecord::new(41, 40).with_command_name("proctree"),
            ProcessRecord::new(42, 40)
                .with_command_name("sleep")
                .with_state(ProcessState::Stopped),
            ProcessRecord::new(50, 1).with_command_name("cron"),
        ]);
        let engine = QueryEngine::new(&snapshot);
        let markers = vec!["bash".to_string()];

        assert_eq!(
            engine.count_by_shell_ancestry(ShellScope::WithShellAncestor, &markers, 41),
            QueryOutcome::SystemCount {
                scope: ShellScope::WithShellAncestor,
                count: 2
            }
        );
        assert_eq!(
            engine.count_by_shell_ancestry(ShellScope::WithoutShellAncestor, &markers, 41),
            QueryOutcome::SystemCount {
                scope: ShellScope::WithoutShellAncestor,
                count: 2
            }
        );
    }
}
