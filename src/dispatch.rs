//! Guarded signal dispatch to relational process sets
//!
//! Each operation resolves a set of pids from the snapshot (parent,
//! siblings, grandchildren, ...), asks the safety policy about every member
//! at the moment of delivery, and sends the signal. Delivery is best effort:
//! the live tree may have moved on since the scan, so a failure for one pid
//! is recorded and the batch carries on.

use crate::core::models::{ProcessSnapshot, ProcessState};
use crate::core::process_tree::{collect_descendants, direct_children, is_in_subtree, parent_of};
use crate::error::{ProcTreeError, ProcTreeResult};
use crate::safety::{CommandNameLookup, SafetyPolicy, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Unconditional kill (SIGKILL)
    Terminate,
    /// SIGSTOP
    Stop,
    /// SIGCONT
    Resume,
}

impl SignalKind {
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Terminate => "SIGKILL",
            SignalKind::Stop => "SIGSTOP",
            SignalKind::Resume => "SIGCONT",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SignalFailure {
    #[error("no such process")]
    NoSuchProcess,
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0}")]
    Other(String),
}

/// Delivers a signal to one pid.
pub trait SignalSender {
    fn send(&self, pid: u32, kind: SignalKind) -> Result<(), SignalFailure>;
}

impl<T: SignalSender + ?Sized> SignalSender for &T {
    fn send(&self, pid: u32, kind: SignalKind) -> Result<(), SignalFailure> {
        (**self).send(pid, kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOperation {
    TerminateGrandparent,
    TerminateParent,
    TerminateSiblings,
    TerminateParentSiblings,
    TerminateGrandchildren,
    TerminateChildren,
    TerminateSubtreeOldestFirst,
    SuspendDescendants,
    ResumeStoppedDescendants,
    TerminateRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Grandparent,
    Parent,
    Sibling,
    ParentSibling,
    Grandchild,
    Child,
    Descendant,
    Root,
}

impl Relation {
    pub fn label(&self) -> &'static str {
        match self {
            Relation::Grandparent => "grandparent",
            Relation::Parent => "parent",
            Relation::Sibling => "sibling",
            Relation::ParentSibling => "uncle",
            Relation::Grandchild => "grandchild",
            Relation::Child => "child",
            Relation::Descendant => "descendant",
            Relation::Root => "root",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    /// Resolved and cleared by the policy, but not sent.
    DryRun,
    Refused { verdict: Verdict },
    Failed { failure: SignalFailure },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchEntry {
    pub pid: u32,
    pub relation: Relation,
    pub signal: SignalKind,
    pub outcome: DeliveryOutcome,
    /// Filled for creation-ordered kills.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_order_key: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub operation: SignalOperation,
    pub target: u32,
    pub entries: Vec<DispatchEntry>,
    /// Set when the relation itself could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

impl DispatchReport {
    fn new(operation: SignalOperation, target: u32) -> Self {
        Self {
            operation,
            target,
            entries: Vec::new(),
            missing: None,
        }
    }

    fn missing(operation: SignalOperation, target: u32, message: String) -> Self {
        Self {
            missing: Some(message),
            ..Self::new(operation, target)
        }
    }

    pub fn delivered(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == DeliveryOutcome::Delivered)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, DeliveryOutcome::Failed { .. }))
    }

    pub fn refused(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, DeliveryOutcome::Refused { .. }))
    }

    pub fn pids(&self) -> Vec<u32> {
        self.entries.iter().map(|entry| entry.pid).collect()
    }
}

/// Best-effort signal delivery to relational process sets.
///
/// Every resolved pid gets one entry; a refusal or failed send is recorded
/// and the batch continues.
pub struct SignalDispatcher<'a, L, S> {
    snapshot: &'a ProcessSnapshot,
    policy: &'a SafetyPolicy<L>,
    sender: &'a S,
    dry_run: bool,
}

impl<'a, L: CommandNameLookup, S: SignalSender> SignalDispatcher<'a, L, S> {
    pub fn new(snapshot: &'a ProcessSnapshot, policy: &'a SafetyPolicy<L>, sender: &'a S) -> Self {
        Self {
            snapshot,
            policy,
            sender,
            dry_run: false,
        }
    }

    /// Resolve and policy-check targets without sending anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run `operation` for `target` within the subtree rooted at `root`.
    /// Nothing is signalled when `target` is outside that subtree.
    pub fn run(
        &self,
        operation: SignalOperation,
        root: u32,
        target: u32,
    ) -> ProcTreeResult<DispatchReport> {
        if !is_in_subtree(self.snapshot, root, target) {
            return Err(ProcTreeError::NotInSubtree { target, root });
        }
        debug!(?operation, root, target, dry_run = self.dry_run, "dispatching signals");

        let report = match operation {
            SignalOperation::TerminateGrandparent => self.terminate_grandparent(target),
            SignalOperation::TerminateParent => self.terminate_parent(target),
            SignalOperation::TerminateSiblings => self.terminate_siblings(target),
            SignalOperation::TerminateParentSiblings => self.terminate_parent_siblings(target),
            SignalOperation::TerminateGrandchildren => self.terminate_grandchildren(target),
            SignalOperation::TerminateChildren => self.terminate_children(target),
            SignalOperation::TerminateSubtreeOldestFirst => {
                self.terminate_subtree_oldest_first(target)
            }
            SignalOperation::SuspendDescendants => self.suspend_descendants(target),
            SignalOperation::ResumeStoppedDescendants => self.resume_descendants(target),
            SignalOperation::TerminateRoot => self.terminate_root(root),
        };
        Ok(report)
    }

    fn known_parent(&self, pid: u32) -> Option<u32> {
        parent_of(self.snapshot, pid).filter(|&parent| parent != 0)
    }

    fn deliver(&self, report: &mut DispatchReport, pid: u32, relation: Relation, signal: SignalKind) {
        let verdict = self.policy.check(pid);
        let outcome = if verdict == Verdict::Vanished {
            warn!(pid, relation = relation.label(), signal = signal.name(), "process exited before delivery");
            DeliveryOutcome::Failed {
                failure: SignalFailure::NoSuchProcess,
            }
        } else if !verdict.is_allowed() {
            DeliveryOutcome::Refused { verdict }
        } else if self.dry_run {
            DeliveryOutcome::DryRun
        } else {
            match self.sender.send(pid, signal) {
                Ok(()) => {
                    info!(pid, relation = relation.label(), signal = signal.name(), "signal delivered");
                    DeliveryOutcome::Delivered
                }
                Err(failure) => {
                    warn!(pid, relation = relation.label(), signal = signal.name(), %failure, "signal delivery failed");
                    DeliveryOutcome::Failed { failure }
                }
            }
        };

        report.entries.push(DispatchEntry {
            pid,
            relation,
            signal,
            outcome,
            start_order_key: None,
            created_at: None,
        });
    }

    fn deliver_all(
        &self,
        report: &mut DispatchReport,
        indices: &[usize],
        relation: Relation,
        signal: SignalKind,
    ) {
        for &idx in indices {
            let pid = self.snapshot.records()[idx].pid;
            self.deliver(report, pid, relation, signal);
        }
    }

    fn pids_with_parent(&self, parent: u32, except: u32) -> Vec<u32> {
        direct_children(self.snapshot, parent)
            .into_iter()
            .map(|idx| self.snapshot.records()[idx].pid)
            .filter(|&pid| pid != except)
            .collect()
    }

    pub fn terminate_grandparent(&self, target: u32) -> DispatchReport {
        let operation = SignalOperation::TerminateGrandparent;
        let Some(parent) = self.known_parent(target) else {
            return DispatchReport::missing(operation, target, format!("No parent for process {target}"));
        };
        let Some(grandparent) = self.known_parent(parent) else {
            return DispatchReport::missing(
                operation,
                target,
                format!("No grandparent for process {target}"),
            );
        };

        let mut report = DispatchReport::new(operation, target);
        self.deliver(&mut report, grandparent, Relation::Grandparent, SignalKind::Terminate);
        report
    }

    pub fn terminate_parent(&self, target: u32) -> DispatchReport {
        let operation = SignalOperation::TerminateParent;
        let Some(parent) = self.known_parent(target) else {
            return DispatchReport::missing(operation, target, format!("No parent for process {target}"));
        };

        let mut report = DispatchReport::new(operation, target);
        self.deliver(&mut report, parent, Relation::Parent, SignalKind::Terminate);
        report
    }

    pub fn terminate_siblings(&self, target: u32) -> DispatchReport {
        let operation = SignalOperation::TerminateSiblings;
        let Some(parent) = self.known_parent(target) else {
            return DispatchReport::missing(operation, target, format!("No parent for process {target}"));
        };

        let mut report = DispatchReport::new(operation, target);
        for sibling in self.pids_with_parent(parent, target) {
            self.deliver(&mut report, sibling, Relation::Sibling, SignalKind::Terminate);
        }
        report
    }

    /// Siblings of the parent: every child of the grandparent except the
    /// parent itself.
    pub fn terminate_parent_siblings(&self, target: u32) -> DispatchReport {
        let operation = SignalOperation::TerminateParentSiblings;
        let Some(parent) = self.known_parent(target) else {
            return DispatchReport::missing(operation, target, format!("No parent for process {target}"));
        };
        let Some(grandparent) = self.known_parent(parent) else {
            return DispatchReport::missing(
                operation,
                target,
                format!("No grandparent for process {target}"),
            );
        };

        let mut report = DispatchReport::new(operation, target);
        for uncle in self.pids_with_parent(grandparent, parent) {
            self.deliver(&mut report, uncle, Relation::ParentSibling, SignalKind::Terminate);
        }
        report
    }

    pub fn terminate_grandchildren(&self, target: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::TerminateGrandchildren, target);
        for child_idx in direct_children(self.snapshot, target) {
            let child = self.snapshot.records()[child_idx].pid;
            let grandchildren = direct_children(self.snapshot, child);
            self.deliver_all(&mut report, &grandchildren, Relation::Grandchild, SignalKind::Terminate);
        }
        report
    }

    pub fn terminate_children(&self, target: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::TerminateChildren, target);
        let children = direct_children(self.snapshot, target);
        self.deliver_all(&mut report, &children, Relation::Child, SignalKind::Terminate);
        report
    }

    /// Kill every descendant, oldest first.
    ///
    /// Older descendants are the likeliest supervisors of younger ones, so
    /// taking them down first leaves fewer chances to respawn what was just
    /// killed. Nothing here is atomic: processes started after the scan are
    /// not seen, and ones that exited show up as delivery failures.
    pub fn terminate_subtree_oldest_first(&self, target: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::TerminateSubtreeOldestFirst, target);
        let mut order = collect_descendants(self.snapshot, target, true);
        order.sort_by_key(|&idx| self.snapshot.records()[idx].age_key());

        for idx in order {
            let record = &self.snapshot.records()[idx];
            self.deliver(&mut report, record.pid, Relation::Descendant, SignalKind::Terminate);
            if let Some(entry) = report.entries.last_mut() {
                entry.start_order_key = Some(record.start_order_key);
                entry.created_at = Some(record.creation_timestamp);
            }
        }
        report
    }

    pub fn suspend_descendants(&self, target: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::SuspendDescendants, target);
        let descendants = collect_descendants(self.snapshot, target, true);
        self.deliver_all(&mut report, &descendants, Relation::Descendant, SignalKind::Stop);
        report
    }

    /// Continue only the descendants the snapshot saw as stopped.
    pub fn resume_descendants(&self, target: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::ResumeStoppedDescendants, target);
        let stopped: Vec<usize> = collect_descendants(self.snapshot, target, true)
            .into_iter()
            .filter(|&idx| self.snapshot.records()[idx].state == ProcessState::Stopped)
            .collect();
        self.deliver_all(&mut report, &stopped, Relation::Descendant, SignalKind::Resume);
        report
    }

    pub fn terminate_root(&self, root: u32) -> DispatchReport {
        let mut report = DispatchReport::new(SignalOperation::TerminateRoot, root);
        self.deliver(&mut report, root, Relation::Root, SignalKind::Terminate);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProcessRecord;
    use crate::utils::config_paths::Settings;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    struct SnapshotNames(HashMap<u32, String>);

    impl CommandNameLookup for SnapshotNames {
        fn command_name(&self, pid: u32) -> Option<String> {
            self.0.get(&pid).cloned()
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: RefCell<Vec<(u32, SignalKind)>>,
        gone: HashSet<u32>,
    }

    impl SignalSender for RecordingSender {
        fn send(&self, pid: u32, kind: SignalKind) -> Result<(), SignalFailure> {
            if self.gone.contains(&pid) {
                return Err(SignalFailure::NoSuchProcess);
            }
            self.sent.borrow_mut().push((pid, kind));
            Ok(())
        }
    }

    //            1 (systemd)
    //            |
    //           10 (bash)
    //        /   |    \
    //      20   21    22
    //     /  \   |
    //   30   31  32
    //    |
    //   40
    fn fixture() -> (ProcessSnapshot, SafetyPolicy<SnapshotNames>) {
        let records = vec![
            ProcessRecord::new(1, 0).with_command_name("systemd"),
            ProcessRecord::new(10, 1).with_command_name("bash"),
            ProcessRecord::new(20, 10)
                .with_command_name("supervisor")
                .with_start_order_key(300),
            ProcessRecord::new(21, 10)
                .with_command_name("worker")
                .with_start_order_key(310),
            ProcessRecord::new(22, 10)
                .with_command_name("bash")
                .with_start_order_key(320),
            ProcessRecord::new(30, 20)
                .with_command_name("job")
                .with_start_order_key(30)
                .with_state(ProcessState::Stopped),
            ProcessRecord::new(31, 20)
                .with_command_name("job")
                .with_start_order_key(10),
            ProcessRecord::new(32, 21)
                .with_command_name("job")
                .with_start_order_key(20)
                .with_state(ProcessState::Stopped),
            ProcessRecord::new(40, 30)
                .with_command_name("leaf")
                .with_start_order_key(40),
        ];
        let names = records
            .iter()
            .map(|r| (r.pid, r.command_name.clone()))
            .collect();
        let snapshot = ProcessSnapshot::from_records(records).expect("snapshot");
        let policy = SafetyPolicy::new(SnapshotNames(names), &Settings::default());
        (snapshot, policy)
    }

    #[test]
    fn outside_subtree_sends_nothing() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let err = dispatcher
            .run(SignalOperation::TerminateChildren, 20, 32)
            .expect_err("32 is not under 20");
        assert!(matches!(err, ProcTreeError::NotInSubtree { target: 32, root: 20 }));
        assert!(sender.sent.borrow().is_empty());
    }

    #[test]
    fn grandparent_and_parent() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_grandparent(40);
        assert_eq!(report.pids(), vec![20]);
        assert_eq!(report.delivered().count(), 1);

        let report = dispatcher.terminate_parent(40);
        assert_eq!(report.pids(), vec![30]);
        assert_eq!(
            sender.sent.borrow().as_slice(),
            &[(20, SignalKind::Terminate), (30, SignalKind::Terminate)]
        );
    }

    #[test]
    fn short_chains_report_missing_relations() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_grandparent(10);
        assert_eq!(
            report.missing.as_deref(),
            Some("No grandparent for process 10")
        );
        let report = dispatcher.terminate_parent(1);
        assert_eq!(report.missing.as_deref(), Some("No parent for process 1"));
        assert!(sender.sent.borrow().is_empty());
    }

    #[test]
    fn siblings_skip_target_and_protected_shells() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_siblings(20);
        assert_eq!(report.pids(), vec![21, 22]);
        assert_eq!(report.delivered().count(), 1);
        assert_eq!(report.refused().count(), 1);
        assert_eq!(sender.sent.borrow().as_slice(), &[(21, SignalKind::Terminate)]);
    }

    #[test]
    fn parent_siblings_exclude_the_parent() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_parent_siblings(30);
        assert_eq!(report.pids(), vec![21, 22]);
        assert!(report.entries.iter().all(|e| e.relation == Relation::ParentSibling));
    }

    #[test]
    fn grandchildren_and_children() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        assert_eq!(dispatcher.terminate_grandchildren(10).pids(), vec![30, 31, 32]);
        assert_eq!(dispatcher.terminate_children(20).pids(), vec![30, 31]);
        assert!(dispatcher.terminate_children(40).entries.is_empty());
    }

    #[test]
    fn subtree_is_killed_oldest_first() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_subtree_oldest_first(20);
        assert_eq!(report.pids(), vec![31, 30, 40]);
        assert_eq!(
            report
                .entries
                .iter()
                .map(|e| e.start_order_key)
                .collect::<Vec<_>>(),
            vec![Some(10), Some(30), Some(40)]
        );
    }

    #[test]
    fn equal_start_keys_are_ordered_by_pid() {
        // 10 -> 30 -> 20, both started in the same tick
        let records = vec![
            ProcessRecord::new(10, 1).with_command_name("worker"),
            ProcessRecord::new(30, 10)
                .with_command_name("job")
                .with_start_order_key(7),
            ProcessRecord::new(20, 30)
                .with_command_name("job")
                .with_start_order_key(7),
        ];
        let names = records
            .iter()
            .map(|r| (r.pid, r.command_name.clone()))
            .collect();
        let snapshot = ProcessSnapshot::from_records(records).expect("snapshot");
        let policy = SafetyPolicy::new(SnapshotNames(names), &Settings::default());
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_subtree_oldest_first(10);
        assert_eq!(report.pids(), vec![20, 30]);
        assert_eq!(
            sender.sent.borrow().as_slice(),
            &[(20, SignalKind::Terminate), (30, SignalKind::Terminate)]
        );
    }

    #[test]
    fn exited_processes_are_reported_as_failures() {
        let (snapshot, _) = fixture();
        let names = snapshot
            .records()
            .iter()
            .filter(|r| r.pid != 30)
            .map(|r| (r.pid, r.command_name.clone()))
            .collect();
        let policy = SafetyPolicy::new(SnapshotNames(names), &Settings::default());
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.terminate_children(20);
        assert_eq!(report.pids(), vec![30, 31]);
        assert_eq!(
            report.entries[0].outcome,
            DeliveryOutcome::Failed {
                failure: SignalFailure::NoSuchProcess
            }
        );
        assert_eq!(report.refused().count(), 0);
        assert_eq!(sender.sent.borrow().as_slice(), &[(31, SignalKind::Terminate)]);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender {
            gone: HashSet::from([30]),
            ..RecordingSender::default()
        };
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.suspend_descendants(20);
        assert_eq!(report.pids(), vec![30, 40, 31]);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.delivered().count(), 2);
        assert_eq!(
            sender.sent.borrow().as_slice(),
            &[(40, SignalKind::Stop), (31, SignalKind::Stop)]
        );
    }

    #[test]
    fn resume_only_targets_stopped_descendants() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher.resume_descendants(10);
        assert_eq!(report.pids(), vec![30, 32]);
        assert!(report.entries.iter().all(|e| e.signal == SignalKind::Resume));
    }

    #[test]
    fn root_kill_is_gated() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender);

        let report = dispatcher
            .run(SignalOperation::TerminateRoot, 1, 40)
            .expect("40 is under init");
        assert_eq!(
            report.entries[0].outcome,
            DeliveryOutcome::Refused {
                verdict: Verdict::RefusedInit
            }
        );

        let report = dispatcher
            .run(SignalOperation::TerminateRoot, 20, 40)
            .expect("40 is under 20");
        assert_eq!(report.delivered().count(), 1);
        assert_eq!(sender.sent.borrow().as_slice(), &[(20, SignalKind::Terminate)]);
    }

    #[test]
    fn dry_run_resolves_without_sending() {
        let (snapshot, policy) = fixture();
        let sender = RecordingSender::default();
        let dispatcher = SignalDispatcher::new(&snapshot, &policy, &sender).with_dry_run(true);

        let report = dispatcher.terminate_children(10);
        assert_eq!(report.pids(), vec![20, 21, 22]);
        assert_eq!(
            report
                .entries
                .iter()
                .filter(|e| e.outcome == DeliveryOutcome::DryRun)
                .count(),
            2
        );
        assert!(sender.sent.borrow().is_empty());
    }
}
