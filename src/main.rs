use std::path::PathBuf;

use script_bridge::config::{init_logging, BridgeConfig};
use script_bridge::{BridgeError, BridgeResult, ScriptHost};

fn load_config(path: Option<&str>) -> BridgeResult<BridgeConfig> {
    let mut config = match path {
        Some(path) if path.ends_with(".json") => BridgeConfig::from_json_file(path)?,
        Some(path) => BridgeConfig::from_toml_file(path)?,
        None => BridgeConfig::load_or_default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn run() -> BridgeResult<()> {
    let mut args = std::env::args().skip(1);
    let script = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| BridgeError::Usage("script_bridge <script.js> [config.toml|config.json]".to_string()))?;
    let config_path = args.next();

    let config = load_config(config_path.as_deref())?;
    init_logging(&config.logging);

    let host = ScriptHost::new(&config)?;
    host.eval_file(&script)?;
    host.run_gc();
    host.teardown();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("script_bridge failed: {}", e);
        std::process::exit(1);
    }
}
