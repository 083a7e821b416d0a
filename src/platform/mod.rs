//! 平台相关实现
//!
//! 进程元数据读取与信号发送，目前仅支持 Unix

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{NixSignalSender, PsutilNames, PsutilSource};
