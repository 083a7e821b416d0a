//! 配置路径管理
//!
//! 用户配置保存在 ~/.proctree/config.json，文件缺失或格式错误时使用默认值。
//! 环境变量 PROCTREE_SHELL_MARKERS（逗号分隔）覆盖文件中的 shell 标记。

use crate::config::{CONFIG_DIRECTORY, CONFIG_FILE_NAME, DEFAULT_SHELL_MARKER, SHELL_MARKERS_ENV};
use crate::error::{errors, ProcTreeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 用户配置（从 config.json 读取）
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UserConfig {
    /// 受保护 shell 的命令名片段
    #[serde(default)]
    pub protected_shell_markers: Option<Vec<String>>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl UserConfig {
    /// 从配置文件加载
    pub fn load(config_file: &Path) -> Self {
        if !config_file.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(config_file) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %config_file.display(), error = %e, "ignoring malformed config file");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %config_file.display(), error = %e, "cannot read config file");
                Self::default()
            }
        }
    }
}

/// 合并后的运行设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub protected_shell_markers: Vec<String>,
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            protected_shell_markers: vec![DEFAULT_SHELL_MARKER.to_string()],
            log_level: None,
        }
    }
}

impl Settings {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序合并
    pub fn resolve(user_config: &UserConfig, env_markers: Option<&str>) -> Self {
        let mut settings = Self::default();

        if let Some(markers) = user_config.protected_shell_markers.as_ref() {
            let markers = clean_markers(markers.iter().map(String::as_str));
            if !markers.is_empty() {
                settings.protected_shell_markers = markers;
            }
        }
        settings.log_level = user_config.log_level.clone();

        if let Some(raw) = env_markers {
            let markers = clean_markers(raw.split(','));
            if !markers.is_empty() {
                debug!(?markers, "shell markers overridden from environment");
                settings.protected_shell_markers = markers;
            }
        }

        settings
    }

    /// 读取默认配置文件与环境变量
    pub fn load() -> ProcTreeResult<Self> {
        let paths = ConfigPaths::new()?;
        let env_markers = std::env::var(SHELL_MARKERS_ENV).ok();
        Ok(Self::resolve(&paths.user_config, env_markers.as_deref()))
    }
}

fn clean_markers<'a>(markers: impl Iterator<Item = &'a str>) -> Vec<String> {
    markers
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .map(str::to_string)
        .collect()
}

/// 配置文件路径集合
pub struct ConfigPaths {
    /// 配置目录（~/.proctree/）
    pub config_dir: PathBuf,
    /// 主配置文件
    pub config_file: PathBuf,
    /// 用户配置
    pub user_config: UserConfig,
}

impl ConfigPaths {
    /// 创建配置路径
    pub fn new() -> ProcTreeResult<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| errors::config_error("Cannot find home directory"))?;
        Ok(Self::under(&home_dir))
    }

    /// 以指定目录作为 home 创建配置路径
    pub fn under(home_dir: &Path) -> Self {
        let config_dir = home_dir.join(CONFIG_DIRECTORY);
        let config_file = config_dir.join(CONFIG_FILE_NAME);
        let user_config = UserConfig::load(&config_file);

        Self {
            config_dir,
            config_file,
            user_config,
        }
    }
}
