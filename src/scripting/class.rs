//! 脚本类描述
//!
//! 每个可脚本化的原生类型实现 [`ScriptClass`]：类名、构造函数、只读属性表、方法表
//! 与字符串化。注册时由 `DEFINE_NATIVE_CLASS` 引导脚本生成构造函数与原型，
//! 所有属性与方法经由一个原生 `binding` 对象回到 Rust。
//!
//! 私有槽保存在每个类闭包内的 `WeakMap` 中（脚本无法读取或复制），
//! 值为 `{ id, anchor }`：`id` 为竞技场 id，`anchor` 随句柄一起被回收并触发清理。

use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Weak;

use rquickjs::function::Rest;
use rquickjs::{Array, Ctx, Exception, Function, IntoJs, Object, Persistent, Value};

use super::bridge::{Bridge, BridgeState};
use super::wrappable::{Native, NativeId, Wrappable};

/// 只读属性
pub struct PropertySpec<T: 'static> {
    pub name: &'static str,
    pub get: for<'js> fn(&Ctx<'js>, &Native<T>) -> rquickjs::Result<Value<'js>>,
}

/// 方法在无法找到原生对象时的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Undefined,
    False,
}

impl Fallback {
    fn value<'js>(self, ctx: &Ctx<'js>) -> Value<'js> {
        match self {
            Fallback::Undefined => Value::new_undefined(ctx.clone()),
            Fallback::False => Value::new_bool(ctx.clone(), false),
        }
    }
}

/// 方法调用的接收者与参数
pub struct Invocation<'a, 'js> {
    pub bridge: &'a Bridge,
    /// 脚本侧的 `this`
    pub this: &'a Value<'js>,
    pub args: &'a [Value<'js>],
}

impl<'a, 'js> Invocation<'a, 'js> {
    /// 位置参数，缺省为 `undefined`
    pub fn arg(&self, ctx: &Ctx<'js>, index: usize) -> Value<'js> {
        arg(ctx, self.args, index)
    }
}

/// 方法
pub struct MethodSpec<T: 'static> {
    pub name: &'static str,
    pub call: for<'a, 'js> fn(&Ctx<'js>, &Native<T>, Invocation<'a, 'js>) -> rquickjs::Result<Value<'js>>,
    pub fallback: Fallback,
}

/// 可脚本化的原生类型
pub trait ScriptClass: Wrappable + Sized {
    /// 全局构造函数名
    const NAME: &'static str;

    /// 校验参数并构造原生对象；参数错误以 `TypeError` 抛出
    fn construct<'js>(ctx: &Ctx<'js>, bridge: &Bridge, args: &[Value<'js>]) -> rquickjs::Result<Self>;

    fn properties() -> &'static [PropertySpec<Self>] {
        &[]
    }

    fn methods() -> &'static [MethodSpec<Self>] {
        &[]
    }

    /// 字符串化；`None` 时使用 `[object <NAME>]`
    fn describe(&self) -> Option<String> {
        None
    }
}

/// 参数用法错误
pub fn type_error<T>(ctx: &Ctx<'_>, message: &str) -> rquickjs::Result<T> {
    Err(Exception::throw_type(ctx, message))
}

/// 位置参数，缺省为 `undefined`
pub fn arg<'js>(ctx: &Ctx<'js>, args: &[Value<'js>], index: usize) -> Value<'js> {
    args.get(index)
        .cloned()
        .unwrap_or_else(|| Value::new_undefined(ctx.clone()))
}

/// 已注册类的脚本侧函数
#[derive(Clone)]
pub struct ClassHandle {
    pub name: &'static str,
    pub constructor: Persistent<Function<'static>>,
    pub wrap: Persistent<Function<'static>>,
    pub slot_of: Persistent<Function<'static>>,
}

/// 每个桥接实例一份的类注册表
#[derive(Default)]
pub struct ClassRegistry {
    definer: Option<Persistent<Function<'static>>>,
    classes: HashMap<TypeId, ClassHandle>,
}

impl ClassRegistry {
    pub fn get<T: 'static>(&self) -> Option<ClassHandle> {
        self.classes.get(&TypeId::of::<T>()).cloned()
    }

    pub fn insert<T: 'static>(&mut self, handle: ClassHandle) {
        self.classes.insert(TypeId::of::<T>(), handle);
    }

    pub fn definer(&self) -> Option<Persistent<Function<'static>>> {
        self.definer.clone()
    }

    pub fn set_definer(&mut self, definer: Persistent<Function<'static>>) {
        self.definer = Some(definer);
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.classes.values().map(|c| c.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// 类定义引导脚本，求值结果为 `defineNativeClass(name, binding, properties, methods)`
pub(crate) const DEFINE_NATIVE_CLASS: &str = r#"
(() => {
    const define = (target, key, value) =>
        Object.defineProperty(target, key, { value, writable: true, enumerable: false, configurable: true });

    return function defineNativeClass(name, binding, properties, methods) {
        const slots = new WeakMap();

        const attach = (target, id, anchor) => {
            slots.set(target, Object.freeze({ id, anchor }));
            return target;
        };

        const slotOf = (value) => {
            if (value === null || (typeof value !== 'object' && typeof value !== 'function')) {
                return undefined;
            }
            const slot = slots.get(value);
            return slot === undefined ? undefined : slot.id;
        };

        const ctor = function (...args) {
            if (new.target === undefined) {
                throw new TypeError(`Constructor ${name} requires 'new'`);
            }
            return binding.construct(...args);
        };
        Object.defineProperty(ctor, 'name', { value: name });

        const proto = ctor.prototype;
        properties.forEach((prop, index) => {
            Object.defineProperty(proto, prop, {
                get() { return binding.get(slotOf(this), index); },
                enumerable: true,
                configurable: true,
            });
        });
        methods.forEach((method, index) => {
            const fn = function (...args) { return binding.call(slotOf(this), index, this, ...args); };
            Object.defineProperty(fn, 'name', { value: method });
            define(proto, method, fn);
        });

        const describe = function () {
            const text = binding.convert(slotOf(this));
            return text === undefined ? `[object ${name}]` : text;
        };
        define(proto, 'toString', describe);
        define(proto, Symbol.toPrimitive, function (hint) {
            return hint === 'number' ? null : describe.call(this);
        });
        Object.defineProperty(proto, Symbol.toStringTag, { value: name, configurable: true });

        const wrap = (id, anchor) => attach(Object.create(proto), id, anchor);
        return { constructor: ctor, wrap, slotOf };
    };
})()
"#;

/// 注册 `T`：调用引导脚本并保存返回的三个函数
pub(crate) fn register<'js, T: ScriptClass>(
    ctx: &Ctx<'js>,
    bridge: &Bridge,
    definer: &Function<'js>,
) -> rquickjs::Result<ClassHandle> {
    let binding = binding_object::<T>(ctx, bridge)?;

    let properties = Array::new(ctx.clone())?;
    for (index, property) in T::properties().iter().enumerate() {
        properties.set(index, property.name)?;
    }
    let methods = Array::new(ctx.clone())?;
    for (index, method) in T::methods().iter().enumerate() {
        methods.set(index, method.name)?;
    }

    let defined: Object<'js> = definer.call((T::NAME, binding, properties, methods))?;
    let constructor: Function<'js> = defined.get("constructor")?;
    let wrap: Function<'js> = defined.get("wrap")?;
    let slot_of: Function<'js> = defined.get("slotOf")?;

    tracing::debug!(
        target: "bridge",
        class = T::NAME,
        properties = T::properties().len(),
        methods = T::methods().len(),
        "class registered"
    );

    Ok(ClassHandle {
        name: T::NAME,
        constructor: Persistent::save(ctx, constructor),
        wrap: Persistent::save(ctx, wrap),
        slot_of: Persistent::save(ctx, slot_of),
    })
}

/// 原生回调对象：construct / get / call / convert
fn binding_object<'js, T: ScriptClass>(ctx: &Ctx<'js>, bridge: &Bridge) -> rquickjs::Result<Object<'js>> {
    let binding = Object::new(ctx.clone())?;

    let weak = bridge.downgrade();
    binding.set(
        "construct",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
            let Some(bridge) = Bridge::upgrade(&weak) else {
                return Err(Exception::throw_message(&ctx, "script host has been torn down"));
            };
            let object = T::construct(&ctx, &bridge, &args.0)?;
            bridge.associate(&ctx, object)
        })?
        .with_name("construct")?,
    )?;

    let weak = bridge.downgrade();
    binding.set(
        "get",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: Value<'js>, index: u32| {
            let undefined = Value::new_undefined(ctx.clone());
            let Some(property) = T::properties().get(index as usize) else {
                return Ok(undefined);
            };
            match resolve::<T>(&weak, &id) {
                Some((_, native)) => (property.get)(&ctx, &native),
                None => Ok(undefined),
            }
        })?
        .with_name("get")?,
    )?;

    let weak = bridge.downgrade();
    binding.set(
        "call",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, id: Value<'js>, index: u32, this: Value<'js>, args: Rest<Value<'js>>| {
                let Some(method) = T::methods().get(index as usize) else {
                    return Ok(Value::new_undefined(ctx.clone()));
                };
                match resolve::<T>(&weak, &id) {
                    Some((bridge, native)) => {
                        let invocation = Invocation {
                            bridge: &bridge,
                            this: &this,
                            args: &args.0,
                        };
                        (method.call)(&ctx, &native, invocation)
                    }
                    None => Ok(method.fallback.value(&ctx)),
                }
            },
        )?
        .with_name("call")?,
    )?;

    let weak = bridge.downgrade();
    binding.set(
        "convert",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, id: Value<'js>| {
            let text = resolve::<T>(&weak, &id).and_then(|(_, native)| native.borrow().describe());
            match text {
                Some(text) => text.into_js(&ctx),
                None => Ok(Value::new_undefined(ctx.clone())),
            }
        })?
        .with_name("convert")?,
    )?;

    Ok(binding)
}

fn resolve<T: ScriptClass>(
    weak: &Weak<BridgeState>,
    id: &Value<'_>,
) -> Option<(Bridge, Native<T>)> {
    let bridge = Bridge::upgrade(weak)?;
    let id = NativeId::from_value(id)?;
    let native = bridge.resolve::<T>(id)?;
    Some((bridge, native))
}
