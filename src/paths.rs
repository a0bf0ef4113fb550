use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("unable to resolve config directory")?;
    Ok(base.join("clipcast").join("config.toml"))
}
