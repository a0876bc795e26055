//! 事件模型
//!
//! - [`ListenerRegistry`]: 每个 EventTarget 实例的监听器表，事件类型名 → 有序回调序列，
//!   外加每个类型至多一个 "on-event" 处理器（在有序序列之后触发）
//! - [`EventData`]: `Event` 对象的原生状态
//!
//! 注册表对回调类型是泛型的：脚本侧存放受保护的函数引用
//! (`scripting::managed::ManagedValue`)，纯 Rust 代码和测试可以存放任意值。

use std::collections::HashMap;
use std::time::Instant;


/// 监听器注册表
///
/// 键区分大小写；同一回调可以重复注册，重复注册会被触发多次。
#[derive(Debug)]
pub struct ListenerRegistry<C> {
    listeners: HashMap<String, Vec<C>>,
    handlers: HashMap<String, C>,
}

impl<C> Default for ListenerRegistry<C> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
            handlers: HashMap::new(),
        }
    }
}

impl<C> ListenerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加监听器，插入顺序即派发顺序
    pub fn add(&mut self, event_type: &str, callback: C) {
        self.listeners
            .entry(event_type.to_string())
            .or_default()
            .push(callback);
    }

    /// 移除所有满足 `matches` 的监听器并返回它们
    ///
    /// 返回值由调用方丢弃，受保护回调在丢弃时解除保护。
    /// 序列被清空时同时移除该事件类型的键。
    pub fn remove<F>(&mut self, event_type: &str, matches: F) -> Vec<C>
    where
        F: Fn(&C) -> bool,
    {
        let Some(callbacks) = self.listeners.get_mut(event_type) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(callbacks.len());
        for callback in callbacks.drain(..) {
            if matches(&callback) {
                removed.push(callback);
            } else {
                kept.push(callback);
            }
        }

        if kept.is_empty() {
            self.listeners.remove(event_type);
        } else {
            *callbacks = kept;
        }
        removed
    }

    /// 设置或清除 on-event 处理器，返回被替换的旧处理器
    pub fn set_handler(&mut self, event_type: &str, handler: Option<C>) -> Option<C> {
        match handler {
            Some(handler) => self.handlers.insert(event_type.to_string(), handler),
            None => self.handlers.remove(event_type),
        }
    }

    pub fn handler(&self, event_type: &str) -> Option<&C> {
        self.handlers.get(event_type)
    }

    /// 某事件类型的有序监听器
    pub fn listeners(&self, event_type: &str) -> &[C] {
        self.listeners
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 该事件类型是否存在有序监听器序列
    ///
    /// 派发以此为准：只有 on-event 处理器而没有序列时不派发。
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listeners
            .get(event_type)
            .is_some_and(|callbacks| !callbacks.is_empty())
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners(event_type).len()
    }

    /// 所有监听器与处理器的总数
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum::<usize>() + self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.handlers.is_empty()
    }

    /// 取出全部条目，注册表变为空
    pub fn drain(&mut self) -> Vec<C> {
        let mut drained: Vec<C> = self
            .listeners
            .drain()
            .flat_map(|(_, callbacks)| callbacks)
            .collect();
        drained.extend(self.handlers.drain().map(|(_, handler)| handler));
        drained
    }
}

/// `Event` 的原生状态
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub event_type: String,
    pub cancelable: bool,
    pub default_prevented: bool,
    /// 相对宿主启动时刻的毫秒数
    pub time_stamp: f64,
}

impl EventData {
    pub fn new(event_type: impl Into<String>, cancelable: bool, epoch: Instant) -> Self {
        Self {
            event_type: event_type.into(),
            cancelable,
            default_prevented: false,
            time_stamp: epoch.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// 只有可取消事件会记录 preventDefault
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }
}
