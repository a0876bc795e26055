//! 脚本桥接
//!
//! - [`wrappable`]: 原生对象竞技场与稳定 id
//! - [`managed`]: 受保护的回调 (RAII)
//! - [`class`]: 类描述与注册
//! - [`bridge`]: 配对、查找、清理
//! - [`event_bindings`] / [`file_bindings`]: `EventTarget`、`Event`、`File`
//! - [`console`]: `console.*` 转发到 tracing
//!
//! [`ScriptHost`] 拥有运行时、上下文与桥接状态，负责初始化和拆除。

pub mod bridge;
pub mod class;
pub mod console;
pub mod event_bindings;
pub mod file_bindings;
pub mod managed;
pub mod wrappable;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use rquickjs::{CatchResultExt, Context, Ctx, FromJs, Runtime, Value};

pub use bridge::Bridge;
pub use class::{Fallback, Invocation, MethodSpec, PropertySpec, ScriptClass};
pub use event_bindings::{Event, EventTarget};
pub use file_bindings::File;
pub use managed::{ManagedValue, ProtectionLedger};
pub use wrappable::{Native, NativeArena, NativeId, Wrappable};

use crate::config::{BridgeConfig, RuntimeConfig};
use crate::core::{BridgeError, BridgeResult};
use crate::events::EventData;
use crate::file::FileBackends;
use crate::platform::{HttpFetcher, NativeFilesystem, StorageRoots};

/// 脚本宿主
///
/// 字段顺序即析构顺序：桥接状态先于上下文与运行时释放。
pub struct ScriptHost {
    bridge: Bridge,
    context: Context,
    runtime: Runtime,
}

impl ScriptHost {
    /// 按配置创建宿主：本地文件系统、配置的存储根目录、阻塞 HTTP 客户端
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        let backends = FileBackends::new(
            Arc::new(NativeFilesystem::new()),
            Arc::new(StorageRoots::from_config(&config.storage)),
            Arc::new(HttpFetcher::from_config(&config.remote)?),
        );
        Self::with_backends(&config.runtime, backends)
    }

    /// 使用给定的文件后端创建宿主
    pub fn with_backends(config: &RuntimeConfig, backends: FileBackends) -> BridgeResult<Self> {
        let runtime = Runtime::new()?;
        if config.memory_limit_bytes > 0 {
            runtime.set_memory_limit(config.memory_limit_bytes);
        }
        if config.max_stack_size > 0 {
            runtime.set_max_stack_size(config.max_stack_size);
        }
        if config.gc_threshold_bytes > 0 {
            runtime.set_gc_threshold(config.gc_threshold_bytes);
        }

        let context = Context::full(&runtime)?;
        let bridge = Bridge::new(backends);

        context.with(|ctx| {
            install_globals(&ctx, &bridge)
                .catch(&ctx)
                .map_err(|e| BridgeError::Script(e.to_string()))
        })?;

        tracing::info!(
            target: "bridge",
            classes = ?bridge.registered_classes(),
            "script host initialized"
        );

        Ok(Self {
            bridge,
            context,
            runtime,
        })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// 在宿主上下文中执行闭包
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: for<'js> FnOnce(Ctx<'js>) -> R,
    {
        self.context.with(f)
    }

    /// 求值脚本源码；脚本异常转换为 [`BridgeError::Script`]
    pub fn eval<T>(&self, source: &str) -> BridgeResult<T>
    where
        T: for<'js> FromJs<'js>,
    {
        self.ensure_live()?;
        self.context.with(|ctx| {
            ctx.eval::<T, _>(source)
                .catch(&ctx)
                .map_err(|e| BridgeError::Script(e.to_string()))
        })
    }

    /// 读取并执行脚本文件
    pub fn eval_file<P: AsRef<Path>>(&self, path: P) -> BridgeResult<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(target: "bridge", path = %path.display(), "evaluating script file");
        self.eval::<()>(&source)
    }

    /// 立即运行一次垃圾回收；不可达句柄的原生对象在此期间被清理
    pub fn run_gc(&self) {
        self.runtime.run_gc();
    }

    /// 从 Rust 侧向全局变量 `global_name` 指向的 `EventTarget` 派发事件
    ///
    /// 返回 `false` 表示可取消事件被 `preventDefault()`。
    pub fn dispatch_event(&self, global_name: &str, event_type: &str, cancelable: bool) -> BridgeResult<bool> {
        self.ensure_live()?;
        self.context.with(|ctx| {
            let target_value: Value = ctx.globals().get(global_name)?;
            let Some(target) = self.bridge.lookup::<EventTarget>(&ctx, &target_value) else {
                return Err(BridgeError::Script(format!(
                    "{global_name} is not an EventTarget"
                )));
            };

            let event = Rc::new(RefCell::new(Event::new(EventData::new(
                event_type,
                cancelable,
                self.bridge.epoch(),
            ))));
            let event_value = self.bridge.associate_shared(&ctx, Rc::clone(&event))?;
            let not_prevented =
                EventTarget::dispatch(&ctx, &target, target_value, &event, event_value.into_value())?;
            Ok(not_prevented)
        })
    }

    /// 拆除：清理全部存活的原生对象并释放脚本引用
    ///
    /// 之后的 `eval` / `dispatch_event` 返回 [`BridgeError::TornDown`]。
    pub fn teardown(&self) -> usize {
        let cleaned = self.bridge.teardown();
        self.runtime.run_gc();
        if cleaned > 0 || self.bridge.ledger().live() > 0 {
            tracing::debug!(
                target: "bridge",
                cleaned,
                protections = self.bridge.ledger().live(),
                "script host torn down"
            );
        }
        cleaned
    }

    fn ensure_live(&self) -> BridgeResult<()> {
        if self.bridge.is_torn_down() {
            Err(BridgeError::TornDown)
        } else {
            Ok(())
        }
    }
}

fn install_globals(ctx: &Ctx<'_>, bridge: &Bridge) -> rquickjs::Result<()> {
    console::install(ctx)?;
    bridge.define_class::<EventTarget>(ctx)?;
    bridge.define_class::<Event>(ctx)?;
    bridge.define_class::<File>(ctx)
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests;
