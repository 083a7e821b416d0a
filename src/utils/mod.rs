//! 工具模块
//!
//! 日志、用户配置与时间格式化

pub mod config_paths;
pub mod logger;
pub mod time_format;
