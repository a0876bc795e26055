//! `console` 对象：转发到 tracing (target `script.console`)

use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object};

fn join(args: Rest<Coerced<String>>) -> String {
    args.0
        .into_iter()
        .map(|arg| arg.0)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn install(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;

    console.set(
        "log",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::info!(target: "script.console", "{}", join(args));
        })?
        .with_name("log")?,
    )?;
    console.set(
        "info",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::info!(target: "script.console", "{}", join(args));
        })?
        .with_name("info")?,
    )?;
    console.set(
        "warn",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::warn!(target: "script.console", "{}", join(args));
        })?
        .with_name("warn")?,
    )?;
    console.set(
        "error",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::error!(target: "script.console", "{}", join(args));
        })?
        .with_name("error")?,
    )?;
    console.set(
        "debug",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::debug!(target: "script.console", "{}", join(args));
        })?
        .with_name("debug")?,
    )?;
    console.set(
        "trace",
        Function::new(ctx.clone(), |args: Rest<Coerced<String>>| {
            tracing::trace!(target: "script.console", "{}", join(args));
        })?
        .with_name("trace")?,
    )?;

    ctx.globals().set("console", console)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_console_accepts_mixed_arguments() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            install(&ctx).unwrap();
            let kind: String = ctx
                .eval("console.log('a', 1, true, null, {}); typeof console.warn")
                .unwrap();
            assert_eq!(kind, "function");
        });
    }
}
