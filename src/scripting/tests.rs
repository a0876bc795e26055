use super::*;
use crate::core::{FileError, FileResult};
use crate::platform::RemoteFetcher;
use std::cell::Cell;

struct Offline;

impl RemoteFetcher for Offline {
    fn fetch_text(&self, url: &str) -> FileResult<String> {
        Err(FileError::Network {
            url: url.to_string(),
            reason: "offline".to_string(),
        })
    }
}

fn host(root: &Path) -> ScriptHost {
    let backends = FileBackends::new(
        Arc::new(NativeFilesystem::new()),
        Arc::new(StorageRoots::new(root.join("bundle"), root.join("docs"))),
        Arc::new(Offline),
    );
    ScriptHost::with_backends(&RuntimeConfig::default(), backends).unwrap()
}

/// 记录清理次数的测试类型
struct Counter {
    cleaned: Rc<Cell<u32>>,
}

impl Wrappable for Counter {
    fn clean_up(&mut self) {
        self.cleaned.set(self.cleaned.get() + 1);
    }
}

impl ScriptClass for Counter {
    const NAME: &'static str = "Counter";

    fn construct<'js>(ctx: &Ctx<'js>, _bridge: &Bridge, _args: &[Value<'js>]) -> rquickjs::Result<Self> {
        class::type_error(ctx, "Counter cannot be constructed from script")
    }
}

#[test]
fn test_globals_installed() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());
    let kinds: String = host
        .eval("[typeof File, typeof EventTarget, typeof Event, typeof console.log].join(',')")
        .unwrap();
    assert_eq!(kinds, "function,function,function,function");
    assert_eq!(
        host.bridge().registered_classes(),
        vec!["Event", "EventTarget", "File"]
    );
}

#[test]
fn test_associate_lookup_finalize() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());
    let cleaned = Rc::new(Cell::new(0));
    let bridge = host.bridge().clone();

    host.with(|ctx| {
        let handle = bridge
            .associate(
                &ctx,
                Counter {
                    cleaned: Rc::clone(&cleaned),
                },
            )
            .unwrap();
        let value = handle.into_value();
        assert!(bridge.lookup::<Counter>(&ctx, &value).is_some());
        // 其他类型的查找失败
        assert!(bridge.lookup::<File>(&ctx, &value).is_none());
        assert_eq!(bridge.live_objects(), 1);
    });

    // 句柄不可达，GC 触发清理
    host.run_gc();
    assert_eq!(cleaned.get(), 1);
    assert_eq!(bridge.live_objects(), 0);

    // 再次 GC 不会重复清理
    host.run_gc();
    assert_eq!(cleaned.get(), 1);
}

#[test]
fn test_finalize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    host.eval::<()>("globalThis.kept = new File('kept.txt');").unwrap();
    let bridge = host.bridge().clone();

    host.with(|ctx| {
        let value: Value = ctx.globals().get("kept").unwrap();
        let id = bridge.id_of::<File>(&ctx, &value).unwrap();
        assert!(bridge.id_of::<EventTarget>(&ctx, &value).is_none());

        assert!(bridge.finalize(id));
        assert!(!bridge.finalize(id));
        assert!(bridge.lookup::<File>(&ctx, &value).is_none());
    });

    // 句柄仍然可达，但原生对象已清理：访问返回 undefined / false
    let after: String = host
        .eval("[String(kept.path), String(kept.delete()), String(kept)].join(',')")
        .unwrap();
    assert_eq!(after, "undefined,false,[object File]");

    host.eval::<()>("delete globalThis.kept;").unwrap();
    host.run_gc();
    assert_eq!(host.bridge().live_objects(), 0);
    assert_eq!(host.teardown(), 0);
}

#[test]
fn test_script_constructor_errors_create_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    let message: String = host
        .eval("try { new File(42); 'no error' } catch (e) { e instanceof TypeError ? 'type error' : String(e) }")
        .unwrap();
    assert_eq!(message, "type error");

    let message: String = host
        .eval("try { File('a.txt'); 'no error' } catch (e) { e.constructor.name }")
        .unwrap();
    assert_eq!(message, "TypeError");
    assert_eq!(host.bridge().live_objects(), 0);
}

#[test]
fn test_accessors_on_prototype_are_inert() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    let result: String = host
        .eval(
            r#"
            const p = File.prototype;
            [String(p.size), String(p.path), String(p.exists),
             String(p.loadAsText()), String(p.createWithText('x')),
             String(File.prototype.delete.call({}))].join(',')
            "#,
        )
        .unwrap();
    assert_eq!(
        result,
        "undefined,undefined,undefined,undefined,false,false"
    );
}

#[test]
fn test_to_primitive_hints() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    let described: String = host.eval("String(new File('a.txt'))").unwrap();
    assert!(described.starts_with("File: "));
    assert!(described.ends_with("a.txt"));

    let concatenated: bool = host
        .eval("const f = new File('b.txt'); ('' + f) === f.toString()")
        .unwrap();
    assert!(concatenated);

    // 数字提示返回 null，算术结果为 0
    let numeric: f64 = host.eval("+new File('c.txt')").unwrap();
    assert_eq!(numeric, 0.0);
}

#[test]
fn test_private_slot_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    let keys: String = host
        .eval("const t = new EventTarget(); JSON.stringify([Object.keys(t), Object.getOwnPropertyNames(t)])")
        .unwrap();
    assert_eq!(keys, "[[],[]]");

    let symbols: i32 = host
        .eval("Object.getOwnPropertySymbols(new EventTarget()).length")
        .unwrap();
    assert_eq!(symbols, 0);

    // 复制全部自有属性（含 Symbol）并挂上原型，副本不会解析到同一原生对象
    let copied: String = host
        .eval(
            r#"
            const original = new File('copied.txt');
            const copy = Object.create(File.prototype);
            for (const key of Reflect.ownKeys(original)) {
                Object.defineProperty(copy, key, Object.getOwnPropertyDescriptor(original, key));
            }
            [copy.path, copy.exists, String(copy), original.path].join(',')
            "#,
        )
        .unwrap();
    assert!(copied.starts_with(",,[object File],"), "{copied}");
    assert!(copied.ends_with("copied.txt"), "{copied}");

    let is_instance: bool = host.eval("new EventTarget() instanceof EventTarget").unwrap();
    assert!(is_instance);
}

#[test]
fn test_dispatch_from_host() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    host.eval::<()>(
        r#"
        globalThis.target = new EventTarget();
        globalThis.seen = [];
        target.addEventListener('ready', (e) => seen.push(e.type));
        target.addEventListener('close', (e) => e.preventDefault());
        "#,
    )
    .unwrap();

    assert!(host.dispatch_event("target", "ready", false).unwrap());
    assert!(!host.dispatch_event("target", "close", true).unwrap());
    assert!(host.dispatch_event("target", "close", false).unwrap());
    let seen: String = host.eval("seen.join(',')").unwrap();
    assert_eq!(seen, "ready");

    assert!(matches!(
        host.dispatch_event("seen", "ready", false),
        Err(BridgeError::Script(_))
    ));
}

#[test]
fn test_teardown_releases_protections() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path());

    host.eval::<()>(
        r#"
        globalThis.a = new EventTarget();
        a.addEventListener('x', () => {});
        a.addEventListener('y', () => {});
        a.setEventHandler('x', () => {});
        "#,
    )
    .unwrap();
    assert_eq!(host.bridge().ledger().live(), 3);

    assert_eq!(host.teardown(), 1);
    assert_eq!(host.bridge().ledger().live(), 0);
    assert_eq!(host.bridge().ledger().acquired(), host.bridge().ledger().released());
    assert!(matches!(host.eval::<()>("1"), Err(BridgeError::TornDown)));
}
