//! `File` 的脚本绑定
//!
//! `new File(path, storageScope?)`：`path` 必须是字符串，`storageScope` 为 0 (资源包)、
//! 1 (用户文档) 或 2 (远程 URL)，缺省或未知值按资源包处理。

use rquickjs::{Array, Ctx, IntoJs, Value};

use super::class::{type_error, Fallback, Invocation, MethodSpec, PropertySpec, ScriptClass};
use super::bridge::Bridge;
use super::wrappable::{Native, Wrappable};
use crate::file::{AbstractFile, StorageScope};

/// 脚本可见的文件对象，委托给具体的 [`AbstractFile`] 实现
pub struct File {
    inner: Box<dyn AbstractFile>,
}

impl File {
    pub fn new(inner: Box<dyn AbstractFile>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &dyn AbstractFile {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.inner.path())
            .field("scope", &self.inner.scope())
            .finish()
    }
}

impl Wrappable for File {}

fn scope_arg(value: &Value<'_>) -> StorageScope {
    if value.is_undefined() {
        return StorageScope::default();
    }
    match value.as_number().and_then(StorageScope::from_script) {
        Some(scope) => scope,
        None => {
            tracing::warn!(target: "file", "unknown storage scope {:?}, using bundle", value);
            StorageScope::default()
        }
    }
}

fn size<'js>(ctx: &Ctx<'js>, file: &Native<File>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_number(ctx.clone(), file.borrow().inner.size() as f64))
}

fn path<'js>(ctx: &Ctx<'js>, file: &Native<File>) -> rquickjs::Result<Value<'js>> {
    file.borrow().inner.path().into_js(ctx)
}

fn exists<'js>(ctx: &Ctx<'js>, file: &Native<File>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_bool(ctx.clone(), file.borrow().inner.exists()))
}

fn is_directory<'js>(ctx: &Ctx<'js>, file: &Native<File>) -> rquickjs::Result<Value<'js>> {
    Ok(Value::new_bool(ctx.clone(), file.borrow().inner.is_directory()))
}

fn load_as_text<'js>(
    ctx: &Ctx<'js>,
    file: &Native<File>,
    _call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let text = file.borrow().inner.load_as_text();
    match text {
        Some(text) => text.into_js(ctx),
        None => Ok(Value::new_undefined(ctx.clone())),
    }
}

fn create_with_text<'js>(
    ctx: &Ctx<'js>,
    file: &Native<File>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let text = call.arg(ctx, 0);
    let created = match text.as_string() {
        Some(text) => {
            let text = text.to_string()?;
            let mut file = file.borrow_mut();
            !file.inner.is_directory() && file.inner.create_with_text(&text)
        }
        None => false,
    };
    Ok(Value::new_bool(ctx.clone(), created))
}

fn list_files<'js>(
    ctx: &Ctx<'js>,
    file: &Native<File>,
    call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    // 先取出子项再创建句柄，避免在借用期间进入引擎
    let children = file.borrow().inner.list_files();

    let array = Array::new(ctx.clone())?;
    for (index, child) in children.into_iter().enumerate() {
        let handle = call.bridge.associate(ctx, File::new(child))?;
        array.set(index, handle)?;
    }
    Ok(array.into_value())
}

fn delete<'js>(
    ctx: &Ctx<'js>,
    file: &Native<File>,
    _call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let deleted = file.borrow_mut().inner.delete();
    Ok(Value::new_bool(ctx.clone(), deleted))
}

fn make_directory<'js>(
    ctx: &Ctx<'js>,
    file: &Native<File>,
    _call: Invocation<'_, 'js>,
) -> rquickjs::Result<Value<'js>> {
    let created = file.borrow_mut().inner.mkdir();
    Ok(Value::new_bool(ctx.clone(), created))
}

impl ScriptClass for File {
    const NAME: &'static str = "File";

    fn construct<'js>(ctx: &Ctx<'js>, bridge: &Bridge, args: &[Value<'js>]) -> rquickjs::Result<Self> {
        let Some(path) = args.first().and_then(Value::as_string) else {
            return type_error(ctx, "File: path must be a string");
        };
        let path = path.to_string()?;
        let scope = args.get(1).map(scope_arg).unwrap_or_default();
        Ok(File::new(bridge.backends().open(&path, scope)))
    }

    fn properties() -> &'static [PropertySpec<Self>] {
        const PROPERTIES: &[PropertySpec<File>] = &[
            PropertySpec { name: "size", get: size },
            PropertySpec { name: "path", get: path },
            PropertySpec { name: "exists", get: exists },
            PropertySpec {
                name: "isDirectory",
                get: is_directory,
            },
        ];
        PROPERTIES
    }

    fn methods() -> &'static [MethodSpec<Self>] {
        const METHODS: &[MethodSpec<File>] = &[
            MethodSpec {
                name: "loadAsText",
                call: load_as_text,
                fallback: Fallback::Undefined,
            },
            MethodSpec {
                name: "createWithText",
                call: create_with_text,
                fallback: Fallback::False,
            },
            MethodSpec {
                name: "listFiles",
                call: list_files,
                fallback: Fallback::Undefined,
            },
            MethodSpec {
                name: "delete",
                call: delete,
                fallback: Fallback::False,
            },
            MethodSpec {
                name: "makeDirectory",
                call: make_directory,
                fallback: Fallback::False,
            },
        ];
        METHODS
    }

    fn describe(&self) -> Option<String> {
        Some(format!("File: {}", self.inner.path()))
    }
}
