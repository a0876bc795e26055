//! 核心宏定义

/// 按字段列表实现 `Default`
///
/// 配置结构体的默认值集中写在一处，`#[serde(default)]` 依赖它补齐缺失字段：
/// ```ignore
/// impl_default!(LoggingConfig {
///     level: LogLevel::Info,
///     log_to_file: false,
///     log_file_path: "script_bridge.log".to_string(),
///     log_to_console: true,
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
