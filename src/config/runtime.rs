/// 脚本运行时配置

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult};

/// QuickJS 运行时限制
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 内存上限（字节），0 表示不限制
    pub memory_limit_bytes: usize,

    /// 最大栈大小（字节），0 表示使用引擎默认值
    pub max_stack_size: usize,

    /// 触发 GC 的分配阈值（字节），0 表示使用引擎默认值
    pub gc_threshold_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 0,
            max_stack_size: 1024 * 1024,
            gc_threshold_bytes: 0,
        }
    }
}

impl RuntimeConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_stack_size != 0 && self.max_stack_size < 64 * 1024 {
            return Err(ConfigError::ValidationError(
                "Stack size below 64 KiB".to_string(),
            ));
        }
        if self.memory_limit_bytes != 0 && self.memory_limit_bytes < 1024 * 1024 {
            return Err(ConfigError::ValidationError(
                "Memory limit below 1 MiB".to_string(),
            ));
        }
        Ok(())
    }
}
