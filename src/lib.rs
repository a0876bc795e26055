//! # Script Bridge
//!
//! 把原生对象暴露给嵌入式 JavaScript 引擎 (QuickJS, 通过 `rquickjs`) 的桥接层。
//!
//! ## Features
//!
//! - **Wrappable**: 原生对象与脚本句柄一一配对，句柄被回收时原生对象恰好清理一次
//! - **Class descriptors**: 每个原生类型一张静态描述表（构造、属性、方法、字符串化）
//! - **Managed callbacks**: 原生侧持有的脚本函数以 RAII 方式保护/解除保护
//! - **EventTarget / Event**: 有序监听器、引用相等的移除、快照派发
//! - **File**: 资源包、用户文档目录与远程 URL 的统一文件对象
//!
//! ### Example
//!
//! ```ignore
//! use script_bridge::config::BridgeConfig;
//! use script_bridge::scripting::ScriptHost;
//!
//! let host = ScriptHost::new(&BridgeConfig::load_or_default())?;
//! let text: String = host.eval("String(new File('readme.txt'))")?;
//! ```
//!
//! ## Modules
//!
//! - [`core`]: 错误类型与通用宏
//! - [`config`]: 配置加载与日志初始化
//! - [`platform`]: 路径解析、文件系统与 HTTP 协作方
//! - [`file`]: `AbstractFile` 及本地/远程实现
//! - [`events`]: 监听器注册表与事件状态
//! - [`scripting`]: 引擎桥接与 `ScriptHost`

/// Error types and shared macros
pub mod core;
/// Configuration loading and logging setup
pub mod config;
/// Path resolution, filesystem and HTTP collaborators
pub mod platform;
/// File abstraction over bundle, documents and remote storage
pub mod file;
/// Listener registry and event state
pub mod events;
/// Script engine bridge and host
pub mod scripting;

pub use crate::core::{BridgeError, BridgeResult};
pub use crate::scripting::ScriptHost;
