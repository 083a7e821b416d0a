//! 日志系统
//!
//! 日志只写入标准错误和可选的日志文件，标准输出留给查询结果

use crate::config::LOG_ENV;
use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

/// 构建过滤器：参数指定的级别优先，其次 PROCTREE_LOG，再次 RUST_LOG，最后 warn
pub fn build_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = log_level {
        return Ok(EnvFilter::try_new(level)?);
    }
    Ok(EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
}

/// 初始化日志系统
///
/// # Arguments
/// * `log_level` - 日志级别 (trace, debug, info, warn, error)
/// * `log_file` - 日志文件路径，如果为 None 则只输出到标准错误
///
/// # Examples
/// ```no_run
/// use proctree::utils::logger::init_logger;
///
/// init_logger(Some("debug"), None).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>, log_file: Option<PathBuf>) -> Result<()> {
    let env_filter = build_filter(log_level)?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Some(log_path) = log_file {
        // 确保日志文件的父目录存在
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_target(true)
            .with_ansi(false)
            .with_level(true);

        registry.with(file_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    tracing::debug!("Logger initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_is_parsed() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("proctree=trace,warn")).is_ok());
    }

    #[test]
    fn garbage_level_is_rejected() {
        assert!(build_filter(Some("=[")).is_err());
    }
}
