//! 核心模块
//!
//! 进程快照、快照构建与进程树遍历

pub mod models;
pub mod process_tree;
pub mod snapshot;
