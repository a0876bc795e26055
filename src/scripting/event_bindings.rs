//! `EventTarget` 与 `Event` 的脚本绑定
//!
//! 派发语义：
//! - 先对监听器序列做快照，派发期间的增删只影响下一次派发
//! - 每个监听器以事件对象为唯一参数同步调用；抛出的异常被捕获并记录，后续监听器照常执行
//! - 有序监听器之后，若该类型注册了 on-event 处理器，最后调用它
//! - 返回值为 `!defaultPrevented`

use rquickjs::function::This;
use rquickjs::{CatchResultExt, Ctx, Function, IntoJs, Value};

use super::bridge::Bridge;
use super::class::{arg, type_error, Fallback, Invocation, MethodSpec, PropertySpec, ScriptClass};
use super::managed::ManagedValue;
use super::wrappable::{Native, Wrappable};
use crate::events::{EventData, ListenerRegistry};

// ============================================================================
// EventTarget
// ============================================================================

/// 脚本可见的事件目标
#[derive(Debug, Default)]
pub struct EventTarget {
    registry: ListenerRegistry<ManagedValue>,
}

impl EventTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.registry.listener_count(event_type)
    }

    /// 监听器与处理器总数（每个都持有一个保护）
    pub fn receiver_count(&self) -> usize {
        self.registry.len()
    }

    pub fn add_listener<'js>(&mut self, ctx: &Ctx<'js>, bridge: &Bridge, event_type: &str, callback: Function<'js>) {
        let managed = ManagedValue::protect(ctx, callback, bridge.ledger());
        self.registry.add(event_type, managed);
    }

    /// 按引用相等移除所有匹配项
    ///
    /// 返回被移除的受保护值；调用方在释放借用后丢弃它们以解除保护。
    #[must_use]
    pub fn remove_listener<'js>(
        &mut self,
        ctx: &Ctx<'js>,
        event_type: &str,
        callback: &Function<'js>,
    ) -> Vec<ManagedValue> {
        self.registry
            .remove(event_type, |managed| managed.is(ctx, callback))
    }

    /// 设置或清除 on-event 处理器，返回被替换的旧处理器
    #[must_use]
    pub fn set_handler<'js>(
        &mut self,
        ctx: &Ctx<'js>,
        bridge: &Bridge,
        event_type: &str,
        handler: Option<Function<'js>>,
    ) -> Option<ManagedValue> {
        let handler = handler.map(|f| ManagedValue::protect(ctx, f, bridge.ledger()));
        self.registry.set_handler(event_type, handler)
    }

    pub fn handler<'js>(&self, ctx: &Ctx<'js>, event_type: &str) -> Option<Function<'js>> {
        self.registry
            .handler(event_type)
            .and_then(|managed| managed.restore(ctx).ok())
    }

    /// 向 `target` 派发 `event`，`this_value` 是监听器中的 `this`
    pub fn dispatch<'js>(
        ctx: &Ctx<'js>,
        target: &Native<EventTarget>,
        this_value: Value<'js>,
        event: &Native<Event>,
        event_value: Value<'js>,
    ) -> rquickjs::Result<bool> {
        let event_type = event.borrow().data.event_type.clone();

        let (listeners, handler) = {
            let target = target.borrow();
            if !target.registry.has_listeners(&event_type) {
                return Ok(!event.borrow().data.default_prevented);
            }
            let listeners = target
                .registry
                .listeners(&event_type)
                .iter()
                .map(|managed| managed.restore(ctx))
                .collect::<rquickjs::Result<Vec<_>>>()?;
            let handler = target
                .registry
                .handler(&event_type)
                .map(|managed| managed.restore(ctx))
                .transpose()?;
            (listeners, handler)
        };

        tracing::trace!(
            target: "bridge",
            event_type = %event_type,
            listeners = listeners.len(),
            handler = handler.is_some(),
            "dispatching event"
        );

        for listener in listeners.iter().chain(handler.iter()) {
            let outcome = listener
                .call::<_, Value<'js>>((This(this_value.clone()), event_value.clone()))
                .catch(ctx);
            if let Err(e) = outcome {
                tracing::error!(target: "script", event_type = %event_type, "event listener failed: {}", e);
            }
        }

        let prevented = event.borrow().data.default_prevented;
        Ok(!prevented)
    }
}

impl Wrappable for EventTarget {
    fn clean_up(&mut self) {
        let released = self.registry.drain().len();
        if released > 0 {
            tracing::trace!(target: "bridge", released, "event target released listeners");
        }
    }
}

/// 事件类型参数：必须是字符串
fn event_type_arg<'js>(ctx: &Ctx<'js>, call: &Invocation<'_, 'js>, method: &str) -> rquickjs::Result<String> {
    match call.arg(ctx, 0).as_string() {
        Some(s) => s.to_string(),
        None => type_error(ctx, &format!("{method}: event type must be a string")),
    }
}

fn add_event_listener<'js>(
    ctx: &Ctx<'js>,
    target: &Native<EventTarget>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let event_type = event_type_arg(ctx, &call, "addEventListener")?;
    let Some(callback) = call.arg(ctx, 1).as_function().cloned() else {
        return type_error(ctx, "addEventListener: callback must be a function");
    };
    target
        .borrow_mut()
        .add_listener(ctx, call.bridge, &event_type, callback);
    Ok(Value::new_undefined(ctx.clone()))
}

fn remove_event_listener<'js>(
    ctx: &Ctx<'js>,
    target: &Native<EventTarget>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let undefined = Value::new_undefined(ctx.clone());
    let event_type = call.arg(ctx, 0);
    let callback = call.arg(ctx, 1);
    let (Some(event_type), Some(callback)) = (event_type.as_string(), callback.as_function()) else {
        return Ok(undefined);
    };
    let event_type = event_type.to_string()?;

    let removed = target
        .borrow_mut()
        .remove_listener(ctx, &event_type, callback);
    drop(removed);
    Ok(undefined)
}

fn dispatch_event<'js>(
    ctx: &Ctx<'js>,
    target: &Native<EventTarget>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let event_value = call.arg(ctx, 0);
    if event_value.is_null() || event_value.is_undefined() {
        return type_error(ctx, "dispatchEvent: event is required");
    }
    let Some(event) = call.bridge.lookup::<Event>(ctx, &event_value) else {
        return type_error(ctx, "dispatchEvent: argument is not an Event");
    };

    let not_prevented = EventTarget::dispatch(ctx, target, call.this.clone(), &event, event_value)?;
    Ok(Value::new_bool(ctx.clone(), not_prevented))
}

fn set_event_handler<'js>(
    ctx: &Ctx<'js>,
    target: &Native<EventTarget>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let event_type = event_type_arg(ctx, &call, "setEventHandler")?;
    let handler = call.arg(ctx, 1);
    let handler = if handler.is_null() || handler.is_undefined() {
        None
    } else {
        match handler.as_function() {
            Some(f) => Some(f.clone()),
            None => return type_error(ctx, "setEventHandler: handler must be a function or null"),
        }
    };

    let previous = target
        .borrow_mut()
        .set_handler(ctx, call.bridge, &event_type, handler);
    drop(previous);
    Ok(Value::new_undefined(ctx.clone()))
}

fn get_event_handler<'js>(
    ctx: &Ctx<'js>,
    target: &Native<EventTarget>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let event_type = event_type_arg(ctx, &call, "getEventHandler")?;
    let handler = target.borrow().handler(ctx, &event_type);
    match handler {
        Some(f) => Ok(f.into_value()),
        None => Ok(Value::new_null(ctx.clone())),
    }
}

impl ScriptClass for EventTarget {
    const NAME: &'static str = "EventTarget";

    fn construct<'js>(_ctx: &Ctx<'js>, _bridge: &Bridge, _args: &[Value<'js>]) -> rquickjs::Result<Self> {
        Ok(EventTarget::new())
    }

    fn methods() -> &'static [MethodSpec<Self>] {
        const METHODS: &[MethodSpec<EventTarget>] = &[
            MethodSpec {
                name: "addEventListener",
                call: add_event_listener,
                fallback: Fallback::Undefined,
            },
            MethodSpec {
                name: "removeEventListener",
                call: remove_event_listener,
                fallback: Fallback::Undefined,
            },
            MethodSpec {
                name: "dispatchEvent",
                call: dispatch_event,
                fallback: Fallback::False,
            },
            MethodSpec {
                name: "setEventHandler",
                call: set_event_handler,
                fallback: Fallback::Undefined,
            },
            MethodSpec {
                name: "getEventHandler",
                call: get_event_handler,
                fallback: Fallback::Undefined,
            },
        ];
        METHODS
    }
}

// ============================================================================
// Event
// ============================================================================

/// 脚本可见的事件对象
#[derive(Debug)]
pub struct Event {
    pub data: EventData,
}

impl Event {
    pub fn new(data: EventData) -> Self {
        Self { data }
    }
}

impl Wrappable for Event {}

fn event_type<'js>(ctx: &Ctx<'js>, event: &Native<Event>) -> rquickjs::Result<Value<'js>> {
    event.borrow().data.event_type.as_str().into_js(ctx)
}

fn event_cancelable<'js>(ctx: &Ctx<'js>, event: &Native<Event>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_bool(ctx.clone(), event.borrow().data.cancelable))
}

fn event_default_prevented<'js>(ctx: &Ctx<'js>, event: &Native<Event>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_bool(ctx.clone(), event.borrow().data.default_prevented))
}

fn event_time_stamp<'js>(ctx: &Ctx<'js>, event: &Native<Event>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_number(ctx.clone(), event.borrow().data.time_stamp))
}

fn prevent_default<'js>(
    ctx: &Ctx<'js>,
    event: &Native<Event>,
    _call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    event.borrow_mut().data.prevent_default();
    Ok(Value::new_undefined(ctx.clone()))
}

impl ScriptClass for Event {
    const NAME: &'static str = "Event";

    fn construct<'js>(ctx: &Ctx<'js>, bridge: &Bridge, args: &[Value<'js>]) -> rquickjs::Result<Self> {
        let Some(event_type) = arg(ctx, args, 0).as_string().map(|s| s.to_string()).transpose()? else {
            return type_error(ctx, "Event: type must be a string");
        };
        let cancelable = match arg(ctx, args, 1).as_object() {
            Some(init) => init
                .get::<_, Value>("cancelable")?
                .as_bool()
                .unwrap_or(false),
            None => false,
        };
        Ok(Event::new(EventData::new(event_type, cancelable, bridge.epoch())))
    }

    fn properties() -> &'static [PropertySpec<Self>] {
        const PROPERTIES: &[PropertySpec<Event>] = &[
            PropertySpec {
                name: "type",
                get: event_type,
            },
            PropertySpec {
                name: "cancelable",
                get: event_cancelable,
            },
            PropertySpec {
                name: "defaultPrevented",
                get: event_default_prevented,
            },
            PropertySpec {
                name: "timeStamp",
                get: event_time_stamp,
            },
        ];
        PROPERTIES
    }

    fn methods() -> &'static [MethodSpec<Self>] {
        const METHODS: &[MethodSpec<Event>] = &[MethodSpec {
            name: "preventDefault",
            call: prevent_default,
            fallback: Fallback::Undefined,
        }];
        METHODS
    }

    fn describe(&self) -> Option<String> {
        Some(format!("Event: {}", self.data.event_type))
    }
}
