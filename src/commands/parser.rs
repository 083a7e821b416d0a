//! CLI 命令行参数解析
//!
//! 使用 clap 解析选项，位置参数按原有的三种形式解释：
//! `<flag>`、`<root> <target>`、`<root> <target> <flag>`
//!
//! 选项必须写在位置参数之前：位置参数接受以 `-` 开头的值，之后的内容都按位置参数处理

use crate::dispatch::SignalOperation;
use crate::error::{ProcTreeError, ProcTreeResult};
use crate::query::{Query, ShellScope};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// proctree - 进程子树查询与信号工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "proctree",
    about = "Query and signal a process subtree",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// `<flag>` | `<root> <target>` | `<root> <target> <flag>`
    #[arg(value_name = "ARGS", allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<String>,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,

    /// 只解析与安全检查目标进程，不发送信号
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// 日志文件路径
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// 尝试解析命令行参数（用于测试或自定义 argv）
    pub fn try_parse_args_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(iter)
    }

    pub fn invocation(&self) -> ProcTreeResult<Invocation> {
        Invocation::from_args(&self.args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Query(Query),
    Signal(SignalOperation),
    System(ShellScope),
}

const OPERATIONS: &[(&str, Operation)] = &[
    ("-dpt", Operation::Query(Query::Depth)),
    ("-lvl", Operation::Query(Query::SameLevel)),
    ("-cnt", Operation::Query(Query::DescendantCount)),
    ("-odt", Operation::Query(Query::OldestDescendant)),
    ("-ndt", Operation::Query(Query::NewestDescendant)),
    ("-dnd", Operation::Query(Query::NonDirectCount)),
    ("-kgp", Operation::Signal(SignalOperation::TerminateGrandparent)),
    ("-kpp", Operation::Signal(SignalOperation::TerminateParent)),
    ("-ksp", Operation::Signal(SignalOperation::TerminateSiblings)),
    ("-kps", Operation::Signal(SignalOperation::TerminateParentSiblings)),
    ("-kgc", Operation::Signal(SignalOperation::TerminateGrandchildren)),
    ("-kcp", Operation::Signal(SignalOperation::TerminateChildren)),
    ("-kst", Operation::Signal(SignalOperation::TerminateSubtreeOldestFirst)),
    ("-dst", Operation::Signal(SignalOperation::SuspendDescendants)),
    ("-dct", Operation::Signal(SignalOperation::ResumeStoppedDescendants)),
    ("-krp", Operation::Signal(SignalOperation::TerminateRoot)),
    ("-mmd", Operation::Query(Query::MostMemory)),
    ("-mpd", Operation::Query(Query::MostCpu)),
    ("-bcp", Operation::System(ShellScope::WithShellAncestor)),
    ("-bop", Operation::System(ShellScope::WithoutShellAncestor)),
];

impl Operation {
    pub fn from_flag(flag: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|(name, _)| *name == flag)
            .map(|(_, operation)| *operation)
    }

    pub fn flag(&self) -> &'static str {
        OPERATIONS
            .iter()
            .find(|(_, operation)| operation == self)
            .map(|(name, _)| *name)
            .unwrap_or("")
    }

    /// `None` for whole-system operations, which take no pids.
    pub fn into_subtree(self) -> Option<SubtreeOperation> {
        match self {
            Operation::Query(query) => Some(SubtreeOperation::Query(query)),
            Operation::Signal(signal) => Some(SubtreeOperation::Signal(signal)),
            Operation::System(_) => None,
        }
    }
}

/// 作用于 `(root, target)` 的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeOperation {
    Query(Query),
    Signal(SignalOperation),
}

impl From<SubtreeOperation> for Operation {
    fn from(operation: SubtreeOperation) -> Self {
        match operation {
            SubtreeOperation::Query(query) => Operation::Query(query),
            SubtreeOperation::Signal(signal) => Operation::Signal(signal),
        }
    }
}

/// 一次调用要执行的内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Subtree {
        root: u32,
        target: u32,
        operation: SubtreeOperation,
    },
    System(ShellScope),
}

impl Invocation {
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> ProcTreeResult<Self> {
        match args {
            [flag] => match Operation::from_flag(flag.as_ref()) {
                Some(Operation::System(scope)) => Ok(Invocation::System(scope)),
                _ => Err(ProcTreeError::UnknownOperation {
                    flag: flag.as_ref().to_string(),
                }),
            },
            [root, target] => {
                let (root, target) = parse_pids(root.as_ref(), target.as_ref())?;
                Ok(Invocation::Subtree {
                    root,
                    target,
                    operation: SubtreeOperation::Query(Query::Membership),
                })
            }
            [root, target, flag] => {
                let operation = Operation::from_flag(flag.as_ref())
                    .and_then(Operation::into_subtree)
                    .ok_or_else(|| ProcTreeError::UnknownOperation {
                        flag: flag.as_ref().to_string(),
                    })?;
                let (root, target) = parse_pids(root.as_ref(), target.as_ref())?;
                Ok(Invocation::Subtree {
                    root,
                    target,
                    operation,
                })
            }
            _ => Err(ProcTreeError::InvalidArguments { given: args.len() }),
        }
    }
}

fn parse_pid(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|&pid| pid > 0)
}

fn parse_pids(root: &str, target: &str) -> ProcTreeResult<(u32, u32)> {
    match (parse_pid(root), parse_pid(target)) {
        (Some(root), Some(target)) => Ok((root, target)),
        _ => Err(ProcTreeError::InvalidPid {
            root: root.to_string(),
            target: target.to_string(),
        }),
    }
}
