//! CLI 命令处理模块
//!
//! 命令行解析与执行

pub mod parser;
pub mod runner;

pub use parser::*;
