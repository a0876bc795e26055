//! 受保护的脚本值
//!
//! `ManagedValue` 让原生对象在回调调用结束后继续持有脚本函数：
//! 创建即保护（持有一个 GC 根），丢弃即解除保护。
//! 保护与解除通过 RAII 成对出现，`ProtectionLedger` 记录当前存活的保护数量。

use std::cell::Cell;
use std::rc::Rc;

use rquickjs::{Ctx, Function, Persistent};

/// 保护计数账本
///
/// 所有 `ManagedValue` 共享同一个账本；`live()` 在全部回调释放后回到基线。
#[derive(Debug, Default)]
pub struct ProtectionLedger {
    live: Cell<usize>,
    acquired: Cell<u64>,
    released: Cell<u64>,
}

impl ProtectionLedger {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn acquire(&self) {
        self.live.set(self.live.get() + 1);
        self.acquired.set(self.acquired.get() + 1);
    }

    fn release(&self) {
        let live = self.live.get();
        debug_assert!(live > 0, "protection released more often than acquired");
        self.live.set(live.saturating_sub(1));
        self.released.set(self.released.get() + 1);
    }

    /// 当前存活的保护数量
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// 累计获取次数
    pub fn acquired(&self) -> u64 {
        self.acquired.get()
    }

    /// 累计释放次数
    pub fn released(&self) -> u64 {
        self.released.get()
    }
}

/// 受保护的脚本函数引用
pub struct ManagedValue {
    value: Persistent<Function<'static>>,
    ledger: Rc<ProtectionLedger>,
}

impl ManagedValue {
    /// 保护一个函数，使其在脚本侧不可达时也不会被回收
    pub fn protect<'js>(ctx: &Ctx<'js>, function: Function<'js>, ledger: &Rc<ProtectionLedger>) -> Self {
        let value = Persistent::save(ctx, function);
        ledger.acquire();
        Self {
            value,
            ledger: Rc::clone(ledger),
        }
    }

    /// 取回可调用的函数；不影响保护计数
    pub fn restore<'js>(&self, ctx: &Ctx<'js>) -> rquickjs::Result<Function<'js>> {
        self.value.clone().restore(ctx)
    }

    /// 引用相等（同一个函数对象），而非值相等
    pub fn is<'js>(&self, ctx: &Ctx<'js>, other: &Function<'js>) -> bool {
        match self.restore(ctx) {
            Ok(function) => function.as_value() == other.as_value(),
            Err(_) => false,
        }
    }
}

impl Drop for ManagedValue {
    fn drop(&mut self) {
        self.ledger.release();
    }
}

impl std::fmt::Debug for ManagedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedValue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_protect_and_release_balance() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let ledger = ProtectionLedger::new();

        context.with(|ctx| {
            let f: Function = ctx.eval("(function () { return 41 + 1; })").unwrap();
            let managed = ManagedValue::protect(&ctx, f, &ledger);
            assert_eq!(ledger.live(), 1);

            let restored = managed.restore(&ctx).unwrap();
            assert_eq!(restored.call::<_, i32>(()).unwrap(), 42);
            assert!(managed.is(&ctx, &restored));

            let other: Function = ctx.eval("(function () {})").unwrap();
            assert!(!managed.is(&ctx, &other));

            drop(managed);
        });

        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.acquired(), 1);
        assert_eq!(ledger.released(), 1);
    }

    #[test]
    fn test_protected_value_survives_gc() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let ledger = ProtectionLedger::new();

        let managed = context.with(|ctx| {
            let f: Function = ctx.eval("(function () { return 'still here'; })").unwrap();
            ManagedValue::protect(&ctx, f, &ledger)
        });

        runtime.run_gc();

        context.with(|ctx| {
            let f = managed.restore(&ctx).unwrap();
            assert_eq!(f.call::<_, String>(()).unwrap(), "still here");
        });
        drop(managed);
        assert_eq!(ledger.live(), 0);
    }
}
