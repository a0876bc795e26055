//! 统一错误处理模块
//!
//! 提供桥接层范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **宿主层错误** (`BridgeError`): 运行时创建、脚本求值、配置加载等面向 Rust 调用方的错误
//! - **文件层错误** (`FileError`): 文件操作内部使用，记录日志后转换为 `false` / `None`，
//!   不会以异常形式穿过脚本边界
//!
//! 只有参数用法错误会以 `TypeError` 抛给脚本，见 `scripting::class`。

use thiserror::Error;

use crate::config::ConfigError;

/// 桥接宿主错误类型
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Host already torn down")]
    TornDown,

    #[error("Usage: {0}")]
    Usage(String),
}

/// 文件操作错误
#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Operation not supported for {path}: {operation}")]
    Unsupported { path: String, operation: &'static str },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Invalid UTF-8 in {path}")]
    Encoding { path: String },
}

impl FileError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound { path }
        } else {
            FileError::Io { path, source }
        }
    }
}

/// 桥接结果类型别名
pub type BridgeResult<T> = Result<T, BridgeError>;
pub type FileResult<T> = Result<T, FileError>;
