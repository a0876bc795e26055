//! 原生对象与脚本句柄的配对
//!
//! 原生对象存放在 [`NativeArena`] 中，以 [`NativeId`] 索引；脚本句柄的私有槽只保存这个
//! 整数 id，不保存任何原生指针。槽位带代数 (generation)：对象清理后旧 id 立即失效，
//! 之后的查找返回 `None`。

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// 原生对象的共享句柄
pub type Native<T> = Rc<RefCell<T>>;

/// 可被脚本句柄包装的原生对象
pub trait Wrappable: Any {
    /// 释放对象持有的资源（例如受保护的回调）
    ///
    /// 每个配对恰好调用一次：句柄被回收时，或宿主拆除时。
    fn clean_up(&mut self) {}
}

/// 代数的有效位数，保证编码后的 id 是安全整数
const GENERATION_BITS: u32 = 21;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;
const INDEX_SPAN: f64 = 4_294_967_296.0;

/// 竞技场中的稳定 id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId {
    index: u32,
    generation: u32,
}

impl NativeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// 编码为脚本数字（私有槽中保存的值）
    pub fn to_script(self) -> f64 {
        f64::from(self.generation) * INDEX_SPAN + f64::from(self.index)
    }

    /// 从脚本数字解码，非法值返回 `None`
    pub fn from_script(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return None;
        }
        let generation = (value / INDEX_SPAN).floor();
        if generation > f64::from(GENERATION_MASK) {
            return None;
        }
        let index = value - generation * INDEX_SPAN;
        Some(Self {
            index: index as u32,
            generation: generation as u32,
        })
    }

    /// 从脚本值解码（`undefined`、非数字等返回 `None`）
    pub fn from_value(value: &rquickjs::Value<'_>) -> Option<Self> {
        value.as_number().and_then(Self::from_script)
    }
}

impl std::fmt::Display for NativeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// 竞技场条目：类型擦除的原生对象 + 对应的清理函数
pub struct NativeEntry {
    class: &'static str,
    object: Rc<dyn Any>,
    finalize: fn(Rc<dyn Any>),
}

impl NativeEntry {
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// 调用对象的 `clean_up` 并释放竞技场持有的引用
    pub fn finalize(self) {
        (self.finalize)(self.object);
    }
}

fn finalize_erased<T: Wrappable>(object: Rc<dyn Any>) {
    let Ok(object) = object.downcast::<RefCell<T>>() else {
        return;
    };
    let borrowed = object.try_borrow_mut();
    match borrowed {
        Ok(mut object) => object.clean_up(),
        Err(_) => {
            tracing::error!(target: "bridge", "native object borrowed during finalization, clean up skipped");
        }
    }
}

struct Slot {
    generation: u32,
    entry: Option<NativeEntry>,
}

/// 原生对象竞技场
#[derive(Default)]
pub struct NativeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NativeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Wrappable>(&mut self, class: &'static str, object: Native<T>) -> NativeId {
        let entry = NativeEntry {
            class,
            object,
            finalize: finalize_erased::<T>,
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return NativeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        NativeId {
            index,
            generation: 0,
        }
    }

    fn entry(&self, id: NativeId) -> Option<&NativeEntry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// 按类型取回原生对象；id 失效或类型不符时返回 `None`
    pub fn get<T: Wrappable>(&self, id: NativeId) -> Option<Native<T>> {
        let entry = self.entry(id)?;
        Rc::clone(&entry.object).downcast::<RefCell<T>>().ok()
    }

    pub fn class_of(&self, id: NativeId) -> Option<&'static str> {
        self.entry(id).map(NativeEntry::class)
    }

    pub fn contains(&self, id: NativeId) -> bool {
        self.entry(id).is_some()
    }

    /// 移除条目并使 id 失效；重复移除返回 `None`
    pub fn remove(&mut self, id: NativeId) -> Option<NativeEntry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK;
        self.free.push(id.index);
        self.live -= 1;
        Some(entry)
    }

    /// 取出全部存活条目（宿主拆除时使用）
    pub fn drain(&mut self) -> Vec<NativeEntry> {
        let mut entries = Vec::with_capacity(self.live);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(entry) = slot.entry.take() {
                slot.generation = (slot.generation + 1) & GENERATION_MASK;
                self.free.push(index as u32);
                entries.push(entry);
            }
        }
        self.live = 0;
        entries
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        cleaned: Rc<Cell<u32>>,
    }

    impl Wrappable for Probe {
        fn clean_up(&mut self) {
            self.cleaned.set(self.cleaned.get() + 1);
        }
    }

    struct Other;
    impl Wrappable for Other {}

    fn probe(counter: &Rc<Cell<u32>>) -> Native<Probe> {
        Rc::new(RefCell::new(Probe {
            cleaned: Rc::clone(counter),
        }))
    }

    #[test]
    fn test_id_script_encoding() {
        let id = NativeId {
            index: 17,
            generation: 3,
        };
        assert_eq!(NativeId::from_script(id.to_script()), Some(id));
        assert_eq!(NativeId::from_script(-1.0), None);
        assert_eq!(NativeId::from_script(1.5), None);
        assert_eq!(NativeId::from_script(f64::NAN), None);
        assert_eq!(NativeId::from_script(f64::INFINITY), None);
    }

    #[test]
    fn test_lookup_checks_type_and_generation() {
        let counter = Rc::new(Cell::new(0));
        let mut arena = NativeArena::new();
        let id = arena.insert("Probe", probe(&counter));

        assert!(arena.get::<Probe>(id).is_some());
        assert!(arena.get::<Other>(id).is_none());
        assert_eq!(arena.class_of(id), Some("Probe"));

        let entry = arena.remove(id).unwrap();
        entry.finalize();
        assert_eq!(counter.get(), 1);
        assert!(arena.get::<Probe>(id).is_none());
        assert!(arena.remove(id).is_none());

        // 槽位复用后旧 id 仍然失效
        let reused = arena.insert("Probe", probe(&counter));
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused.generation(), id.generation());
        assert!(arena.get::<Probe>(id).is_none());
        assert!(arena.get::<Probe>(reused).is_some());
    }

    #[test]
    fn test_drain_finalizes_everything_once() {
        let counter = Rc::new(Cell::new(0));
        let mut arena = NativeArena::new();
        let a = arena.insert("Probe", probe(&counter));
        let _b = arena.insert("Probe", probe(&counter));
        arena.insert("Other", Rc::new(RefCell::new(Other)));
        assert_eq!(arena.len(), 3);

        for entry in arena.drain() {
            entry.finalize();
        }
        assert_eq!(counter.get(), 2);
        assert!(arena.is_empty());
        assert!(!arena.contains(a));
        assert!(arena.drain().is_empty());
    }
}
