//! 命令执行与结果输出
//!
//! 将解析后的调用交给查询引擎或信号分发器，并把结果渲染成文本行或 JSON

use crate::commands::parser::{Invocation, SubtreeOperation};
use crate::core::models::ProcessSnapshot;
use crate::dispatch::{
    DeliveryOutcome, DispatchEntry, DispatchReport, Relation, SignalDispatcher, SignalKind,
    SignalSender,
};
use crate::error::ProcTreeResult;
use crate::query::{QueryEngine, QueryOutcome, Resource};
use crate::safety::{CommandNameLookup, SafetyPolicy};
use crate::utils::time_format::format_creation_time;
use serde::Serialize;

/// 一次调用的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum Execution {
    Query(QueryOutcome),
    Dispatch(DispatchReport),
}

pub struct Runner<'a, L, S> {
    snapshot: &'a ProcessSnapshot,
    policy: SafetyPolicy<L>,
    sender: S,
    dry_run: bool,
    self_pid: u32,
}

impl<'a, L: CommandNameLookup, S: SignalSender> Runner<'a, L, S> {
    pub fn new(snapshot: &'a ProcessSnapshot, policy: SafetyPolicy<L>, sender: S) -> Self {
        Self {
            snapshot,
            policy,
            sender,
            dry_run: false,
            self_pid: std::process::id(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 统计 shell 后代时排除的进程（默认为自身）
    pub fn with_self_pid(mut self, pid: u32) -> Self {
        self.self_pid = pid;
        self
    }

    pub fn execute(&self, invocation: Invocation) -> ProcTreeResult<Execution> {
        let engine = QueryEngine::new(self.snapshot);
        match invocation {
            Invocation::System(scope) => Ok(Execution::Query(engine.count_by_shell_ancestry(
                scope,
                self.policy.shell_markers(),
                self.self_pid,
            ))),
            Invocation::Subtree {
                root,
                target,
                operation,
            } => match operation {
                SubtreeOperation::Query(query) => {
                    engine.run(query, root, target).map(Execution::Query)
                }
                SubtreeOperation::Signal(signal_operation) => {
                    SignalDispatcher::new(self.snapshot, &self.policy, &self.sender)
                        .with_dry_run(self.dry_run)
                        .run(signal_operation, root, target)
                        .map(Execution::Dispatch)
                }
            },
        }
    }
}

/// 渲染为输出行
pub fn render_text(execution: &Execution) -> Vec<String> {
    match execution {
        Execution::Query(outcome) => vec![render_query(outcome)],
        Execution::Dispatch(report) => render_report(report),
    }
}

pub fn render_json(execution: &Execution) -> serde_json::Result<String> {
    serde_json::to_string_pretty(execution)
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_query(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Membership { pid, parent_pid } => {
            format!("Pid is: {pid} and PPID is: {}", parent_pid.unwrap_or(0))
        }
        QueryOutcome::Depth { target, depth } => match depth {
            Some(depth) => format!("Depth of {target} is {depth}"),
            None => format!("Depth of {target} is -1"),
        },
        QueryOutcome::SameLevel { target, count } => {
            format!("No. of processes at the same depth of {target} in the process tree {count}")
        }
        QueryOutcome::DescendantCount { count, .. } => count.to_string(),
        QueryOutcome::OldestDescendant { target, descendant } => format!(
            "Most earliest descendant of {target} is {}, whose creation time is: {}",
            descendant.pid,
            format_creation_time(descendant.creation_timestamp)
        ),
        QueryOutcome::NewestDescendant { target, descendant } => {
            format!("Most recently created descendant of {target} is {}", descendant.pid)
        }
        QueryOutcome::NonDirectCount { count, .. } => format!("Non-direct desc are: {count}"),
        QueryOutcome::ResourceMaximum {
            target,
            resource,
            value,
            pids,
        } => {
            let header = match resource {
                Resource::ResidentMemory => format!(
                    "Descendant(s) of {target} consuming most memory. VmRSS {value} bytes:"
                ),
                Resource::CpuTime => format!(
                    "Descendant(s) of {target} with most CPU time. Total {value} clock ticks:"
                ),
            };
            format!("{header}\n{}", join_pids(pids))
        }
        QueryOutcome::NoDescendants { .. } => "No descendants".to_string(),
        QueryOutcome::SystemCount { count, .. } => count.to_string(),
    }
}

fn render_report(report: &DispatchReport) -> Vec<String> {
    if let Some(missing) = &report.missing {
        return vec![missing.clone()];
    }
    report.entries.iter().flat_map(render_entry).collect()
}

fn announce(entry: &DispatchEntry) -> Option<String> {
    let pid = entry.pid;
    match entry.relation {
        Relation::Grandparent => Some(format!("Killing grandparent...: {pid}")),
        Relation::Parent => Some(format!("Killing parent {pid}")),
        Relation::Sibling => Some(format!("Killing sibling {pid}")),
        Relation::ParentSibling => Some(format!("Killing uncle {pid}")),
        Relation::Grandchild => Some(format!("Killing grandchild {pid}")),
        Relation::Child => Some(format!("Killing child {pid}")),
        Relation::Root => Some(format!("Killing root {pid}")),
        Relation::Descendant => entry
            .start_order_key
            .map(|key| format!("Killing {pid} (created {key})")),
    }
}

fn confirmation(entry: &DispatchEntry) -> String {
    let pid = entry.pid;
    match entry.relation {
        Relation::Sibling | Relation::Child => format!("SIGKILL was sent to {pid}"),
        Relation::Descendant => match entry.created_at {
            Some(created_at) => format!("Terminated {pid} at {}", format_creation_time(created_at)),
            None => format!("{} sent to {pid}", entry.signal.name()),
        },
        _ => format!("{pid} is terminated"),
    }
}

fn render_entry(entry: &DispatchEntry) -> Vec<String> {
    match &entry.outcome {
        DeliveryOutcome::Refused { verdict } => verdict.notice(entry.pid).into_iter().collect(),
        DeliveryOutcome::Delivered => announce(entry)
            .into_iter()
            .chain(std::iter::once(confirmation(entry)))
            .collect(),
        DeliveryOutcome::DryRun => announce(entry)
            .into_iter()
            .chain(std::iter::once(format!(
                "Would send {} to {} (dry run)",
                entry.signal.name(),
                entry.pid
            )))
            .collect(),
        DeliveryOutcome::Failed { failure } => announce(entry)
            .into_iter()
            .chain(std::iter::once(format!(
                "Failed to {} {} {}: {failure}",
                if entry.signal == SignalKind::Terminate {
                    "kill"
                } else {
                    "signal"
                },
                entry.relation.label(),
                entry.pid
            )))
            .collect(),
    }
}

#[cfg(unix)]
mod live {
    use super::*;
    use crate::commands::parser::Cli;
    use crate::core::snapshot::build_snapshot;
    use crate::platform::{NixSignalSender, PsutilNames, PsutilSource};
    use crate::utils::config_paths::Settings;
    use std::io;
    use tracing::debug;

    /// 扫描当前系统并执行一次命令行调用，返回要打印的内容
    pub fn run(cli: &Cli, settings: &Settings) -> ProcTreeResult<String> {
        let invocation = cli.invocation()?;
        debug!(?invocation, "parsed invocation");

        let snapshot = build_snapshot(PsutilSource::new()?)?;
        let policy = SafetyPolicy::new(PsutilNames, settings);
        let runner = Runner::new(&snapshot, policy, NixSignalSender).with_dry_run(cli.dry_run);
        let execution = runner.execute(invocation)?;

        if cli.json {
            Ok(render_json(&execution).map_err(io::Error::from)?)
        } else {
            Ok(render_text(&execution).join("\n"))
        }
    }
}

#[cfg(unix)]
pub use live::run;
