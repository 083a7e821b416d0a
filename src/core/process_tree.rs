//! Process tree navigation
//!
//! Pure functions over a [`ProcessSnapshot`]: parent lookup, ancestor walks,
//! subtree membership, depth, and descendant collection.
//!
//! The snapshot is taken while the live tree keeps changing, so parent links
//! are not trusted to form a forest. Every upward walk is bounded by the
//! snapshot size and every downward walk carries a visited-set.

use crate::core::models::ProcessSnapshot;
use std::collections::{HashMap, HashSet};

/// Parent pid of `pid`, if `pid` is in the snapshot.
pub fn parent_of(snapshot: &ProcessSnapshot, pid: u32) -> Option<u32> {
    snapshot.get(pid).map(|record| record.parent_pid)
}

/// Pid 0 has no record on any supported platform; walks end there.
fn is_boundary(pid: u32) -> bool {
    pid == 0
}

fn walk_limit(snapshot: &ProcessSnapshot) -> usize {
    snapshot.len() + 1
}

/// Number of parent hops from `target` up to `root`, or `None` when `root`
/// is not an ancestor of `target`.
pub fn depth(snapshot: &ProcessSnapshot, root: u32, target: u32) -> Option<usize> {
    if target == root {
        return Some(0);
    }

    let mut current = target;
    for hops in 1..=walk_limit(snapshot) {
        let parent = parent_of(snapshot, current)?;
        if parent == root {
            return Some(hops);
        }
        if is_boundary(parent) || parent == current {
            return None;
        }
        current = parent;
    }
    None
}

/// Whether `target` lies in the subtree rooted at `root`. A pid is always in
/// its own subtree.
pub fn is_in_subtree(snapshot: &ProcessSnapshot, root: u32, target: u32) -> bool {
    depth(snapshot, root, target).is_some()
}

/// The chain `[pid, parent, grandparent, ...]` as far as the snapshot
/// resolves it.
pub fn ancestor_chain(snapshot: &ProcessSnapshot, pid: u32) -> Vec<u32> {
    let mut chain = vec![pid];
    let mut seen: HashSet<u32> = HashSet::from([pid]);
    let mut current = pid;

    while let Some(parent) = parent_of(snapshot, current) {
        if is_boundary(parent) || !seen.insert(parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Record indices whose parent is `pid`, in snapshot order.
pub fn direct_children(snapshot: &ProcessSnapshot, pid: u32) -> Vec<usize> {
    snapshot
        .iter()
        .enumerate()
        .filter(|(_, record)| record.parent_pid == pid && record.pid != pid)
        .map(|(idx, _)| idx)
        .collect()
}

fn child_index(snapshot: &ProcessSnapshot) -> HashMap<u32, Vec<usize>> {
    let mut children: HashMap<u32, Vec<usize>> = HashMap::new();
    for (idx, record) in snapshot.iter().enumerate() {
        if record.parent_pid != record.pid {
            children.entry(record.parent_pid).or_default().push(idx);
        }
    }
    children
}

/// Every record reachable from `root` by following child links, depth-first
/// pre-order with siblings in snapshot order.
///
/// With `exclude_root` the root's own record is left out; otherwise it comes
/// first (when the snapshot has it). A record is never collected twice, so a
/// cycle observed mid-scan cannot loop.
pub fn collect_descendants(snapshot: &ProcessSnapshot, root: u32, exclude_root: bool) -> Vec<usize> {
    let children = child_index(snapshot);
    let mut collected = Vec::new();
    let mut visited: HashSet<u32> = HashSet::from([root]);

    if !exclude_root {
        if let Some(idx) = snapshot.index_of(root) {
            collected.push(idx);
        }
    }

    let mut stack: Vec<usize> = children
        .get(&root)
        .map(|kids| kids.iter().rev().copied().collect())
        .unwrap_or_default();

    while let Some(idx) = stack.pop() {
        let pid = snapshot.records()[idx].pid;
        if !visited.insert(pid) {
            continue;
        }
        collected.push(idx);
        if let Some(kids) = children.get(&pid) {
            stack.extend(kids.iter().rev().copied());
        }
    }

    collected
}

/// Whether `pid` or any of its ancestors runs a command whose name contains
/// one of `markers`.
pub fn has_shell_ancestry(snapshot: &ProcessSnapshot, pid: u32, markers: &[String]) -> bool {
    ancestor_chain(snapshot, pid).into_iter().any(|ancestor| {
        snapshot
            .get(ancestor)
            .map(|record| {
                markers
                    .iter()
                    .any(|marker| record.command_name.contains(marker.as_str()))
            })
            .unwrap_or(false)
    })
}
