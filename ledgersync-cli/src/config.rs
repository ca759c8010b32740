use anyhow::{Context, Result};
use ledgersync_core::EngineConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "ledgersync.toml";

/// Explicit `--config`, else `ledgersync.toml` in the data directory.
pub fn config_path(data_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE))
}

/// Read the config file, or the built-in defaults when there is none.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write the defaults unless a config already exists. Returns whether a file
/// was written.
pub fn init_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        println!("Config already exists: {}", path.display());
        return Ok(false);
    }
    save_config(path, &EngineConfig::default())?;
    println!("Wrote {}", path.display());
    Ok(true)
}
