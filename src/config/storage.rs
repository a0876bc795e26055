/// 存储与远程文件配置

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// 本地存储根目录配置
///
/// 未设置时由 `platform::StorageRoots::from_config` 推导：
/// bundle 根目录为可执行文件所在目录，文档根目录为 `dirs::document_dir()`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 资源包根目录 (storageScope = 0)
    #[serde(default)]
    pub bundle_root: Option<PathBuf>,

    /// 用户文档根目录 (storageScope = 1)
    #[serde(default)]
    pub documents_root: Option<PathBuf>,
}

impl StorageConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, root) in [
            ("bundle_root", &self.bundle_root),
            ("documents_root", &self.documents_root),
        ] {
            if let Some(root) = root {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::ValidationError(format!("{} is empty", name)));
                }
            }
        }
        Ok(())
    }
}

/// 远程文件配置 (storageScope = 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// 请求超时（秒）
    pub timeout_secs: u64,

    /// User-Agent 请求头
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("script_bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RemoteConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Remote timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
