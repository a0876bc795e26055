//! 原生对象与脚本句柄的桥接状态
//!
//! `Bridge` 是一个显式上下文（不是全局单例），由 `ScriptHost` 创建与拆除。
//! 它拥有原生对象竞技场、保护计数账本、类注册表与文件后端。
//!
//! 约束：
//! - 调用脚本引擎时不持有竞技场借用（引擎分配可能触发 GC，进而重入 `finalize`）
//! - `finalize` 先移除条目再调用 `clean_up`，重复调用为空操作

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use rquickjs::{Ctx, Exception, Function, Object, Value};

use super::class::{self, ClassRegistry, ScriptClass};
use super::managed::ProtectionLedger;
use super::wrappable::{Native, NativeArena, NativeId};
use crate::file::FileBackends;

pub struct BridgeState {
    arena: RefCell<NativeArena>,
    ledger: Rc<ProtectionLedger>,
    classes: RefCell<ClassRegistry>,
    backends: FileBackends,
    epoch: Instant,
    torn_down: Cell<bool>,
}

/// 桥接上下文句柄（廉价克隆）
#[derive(Clone)]
pub struct Bridge {
    state: Rc<BridgeState>,
}

/// 锚点函数持有的守卫：句柄被回收时释放锚点，守卫随之触发清理
struct FinalizeGuard {
    id: NativeId,
    bridge: Weak<BridgeState>,
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        if let Some(bridge) = Bridge::upgrade(&self.bridge) {
            bridge.finalize(self.id);
        }
    }
}

impl Bridge {
    pub fn new(backends: FileBackends) -> Self {
        Self {
            state: Rc::new(BridgeState {
                arena: RefCell::new(NativeArena::new()),
                ledger: ProtectionLedger::new(),
                classes: RefCell::new(ClassRegistry::default()),
                backends,
                epoch: Instant::now(),
                torn_down: Cell::new(false),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<BridgeState> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn upgrade(weak: &Weak<BridgeState>) -> Option<Self> {
        weak.upgrade().map(|state| Self { state })
    }

    pub fn ledger(&self) -> &Rc<ProtectionLedger> {
        &self.state.ledger
    }

    pub fn backends(&self) -> &FileBackends {
        &self.state.backends
    }

    /// 宿主启动时刻，`Event.timeStamp` 的基准
    pub fn epoch(&self) -> Instant {
        self.state.epoch
    }

    /// 尚未清理的原生对象数量
    pub fn live_objects(&self) -> usize {
        self.state.arena.borrow().len()
    }

    pub fn registered_classes(&self) -> Vec<&'static str> {
        self.state.classes.borrow().names()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.torn_down.get()
    }

    // ========================================================================
    // 类注册
    // ========================================================================

    /// 注册 `T` 并把构造函数挂到全局对象上
    pub fn define_class<T: ScriptClass>(&self, ctx: &Ctx<'_>) -> rquickjs::Result<()> {
        let handle = self.ensure_class::<T>(ctx)?;
        let constructor = handle.constructor.restore(ctx)?;
        ctx.globals().set(T::NAME, constructor)?;
        Ok(())
    }

    /// 类在每个桥接实例中只创建一次，首次使用时惰性创建
    fn ensure_class<T: ScriptClass>(&self, ctx: &Ctx<'_>) -> rquickjs::Result<class::ClassHandle> {
        if let Some(handle) = self.state.classes.borrow().get::<T>() {
            return Ok(handle);
        }
        if self.is_torn_down() {
            return Err(Exception::throw_message(ctx, "script host has been torn down"));
        }

        let definer = self.definer(ctx)?;
        let handle = class::register::<T>(ctx, self, &definer)?;
        self.state.classes.borrow_mut().insert::<T>(handle.clone());
        Ok(handle)
    }

    fn definer<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Function<'js>> {
        let cached = self.state.classes.borrow().definer();
        if let Some(definer) = cached {
            return definer.restore(ctx);
        }
        let definer: Function<'js> = ctx.eval(class::DEFINE_NATIVE_CLASS)?;
        self.state
            .classes
            .borrow_mut()
            .set_definer(rquickjs::Persistent::save(ctx, definer.clone()));
        Ok(definer)
    }

    // ========================================================================
    // 配对
    // ========================================================================

    /// 为原生对象创建脚本句柄
    pub fn associate<'js, T: ScriptClass>(&self, ctx: &Ctx<'js>, object: T) -> rquickjs::Result<Object<'js>> {
        self.associate_shared(ctx, Rc::new(RefCell::new(object)))
    }

    /// 同 [`Bridge::associate`]，调用方保留原生对象的共享引用
    ///
    /// 任何失败都会回滚竞技场条目并调用 `clean_up`，不会留下半配对状态。
    pub fn associate_shared<'js, T: ScriptClass>(
        &self,
        ctx: &Ctx<'js>,
        object: Native<T>,
    ) -> rquickjs::Result<Object<'js>> {
        if self.is_torn_down() {
            return Err(Exception::throw_message(ctx, "script host has been torn down"));
        }
        let handle = self.ensure_class::<T>(ctx)?;

        let id = self.state.arena.borrow_mut().insert(T::NAME, object);
        match self.pair(ctx, &handle, id) {
            Ok(object) => {
                tracing::trace!(target: "bridge", class = T::NAME, %id, "associated");
                Ok(object)
            }
            Err(e) => {
                tracing::warn!(target: "bridge", class = T::NAME, %id, "association failed: {}", e);
                self.finalize(id);
                Err(e)
            }
        }
    }

    fn pair<'js>(&self, ctx: &Ctx<'js>, handle: &class::ClassHandle, id: NativeId) -> rquickjs::Result<Object<'js>> {
        let guard = FinalizeGuard {
            id,
            bridge: self.downgrade(),
        };
        let anchor = Function::new(ctx.clone(), move || {
            let _anchored = &guard;
        })?;
        let wrap = handle.wrap.clone().restore(ctx)?;
        wrap.call((id.to_script(), anchor))
    }

    /// 从脚本值取回 `T` 的原生对象
    ///
    /// 非 `T` 实例、原型对象本身或已清理的对象都返回 `None`。
    pub fn lookup<'js, T: ScriptClass>(&self, ctx: &Ctx<'js>, value: &Value<'js>) -> Option<Native<T>> {
        self.resolve::<T>(self.id_of::<T>(ctx, value)?)
    }

    /// 读取 `T` 实例私有槽中的 id（不检查对象是否已清理）
    pub fn id_of<'js, T: ScriptClass>(&self, ctx: &Ctx<'js>, value: &Value<'js>) -> Option<NativeId> {
        let handle = self.state.classes.borrow().get::<T>()?;
        let slot_of = handle.slot_of.restore(ctx).ok()?;
        match slot_of.call::<_, Value<'js>>((value.clone(),)) {
            Ok(id) => NativeId::from_value(&id),
            Err(_) => {
                // 清除挂起的异常
                let _ = ctx.catch();
                None
            }
        }
    }

    /// 按 id 取回原生对象
    pub fn resolve<T: ScriptClass>(&self, id: NativeId) -> Option<Native<T>> {
        self.state.arena.borrow().get::<T>(id)
    }

    /// 清理一个原生对象；已清理的 id 返回 `false`
    pub fn finalize(&self, id: NativeId) -> bool {
        let entry = self.state.arena.borrow_mut().remove(id);
        match entry {
            Some(entry) => {
                tracing::trace!(target: "bridge", class = entry.class(), %id, "finalized");
                entry.finalize();
                true
            }
            None => false,
        }
    }

    /// 清理全部存活对象并释放类注册表中的脚本引用
    ///
    /// 必须在运行时销毁之前调用；重复调用为空操作。
    pub fn teardown(&self) -> usize {
        if self.state.torn_down.replace(true) {
            return 0;
        }

        let entries = self.state.arena.borrow_mut().drain();
        let cleaned = entries.len();
        for entry in entries {
            entry.finalize();
        }

        let registry = std::mem::take(&mut *self.state.classes.borrow_mut());
        drop(registry);

        tracing::debug!(
            target: "bridge",
            cleaned,
            protections = self.state.ledger.live(),
            "bridge torn down"
        );
        cleaned
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("live_objects", &self.live_objects())
            .field("protections", &self.state.ledger.live())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
