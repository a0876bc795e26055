/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和默认值
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod logging;
pub mod runtime;
pub mod storage;

pub use logging::{init_logging, LogLevel, LoggingConfig};
pub use runtime::RuntimeConfig;
pub use storage::{RemoteConfig, StorageConfig};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 桥接主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 存储根目录
    #[serde(default)]
    pub storage: StorageConfig,

    /// 远程文件
    #[serde(default)]
    pub remote: RemoteConfig,

    /// 脚本运行时
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 使用给定的查找函数覆盖配置（便于测试，不依赖进程环境）
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // 存储配置
        if let Some(val) = lookup("SCRIPT_BRIDGE_BUNDLE_ROOT") {
            self.storage.bundle_root = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("SCRIPT_BRIDGE_DOCUMENTS_ROOT") {
            self.storage.documents_root = Some(PathBuf::from(val));
        }

        // 远程配置
        if let Some(val) = lookup("SCRIPT_BRIDGE_REMOTE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.remote.timeout_secs = secs;
            }
        }

        // 运行时配置
        if let Some(val) = lookup("SCRIPT_BRIDGE_MEMORY_LIMIT") {
            if let Ok(limit) = val.parse() {
                self.runtime.memory_limit_bytes = limit;
            }
        }

        // 日志配置
        if let Some(val) = lookup("SCRIPT_BRIDGE_LOG_LEVEL") {
            if let Ok(level) = val.parse() {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.storage.validate()?;
        self.remote.validate()?;
        self.runtime.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./script_bridge.toml
    /// 2. ./script_bridge.json
    /// 3. ~/.config/script_bridge/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("script_bridge.toml") {
            tracing::info!(target: "config", "Loaded config from script_bridge.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("script_bridge.json") {
            tracing::info!(target: "config", "Loaded config from script_bridge.json");
            return config;
        }

        if let Some(dir) = dirs::config_dir() {
            let config_path = dir.join("script_bridge").join("config.toml");
            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}
