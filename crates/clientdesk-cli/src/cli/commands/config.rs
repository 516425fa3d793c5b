//! Config command handlers.

use std::path::Path;

use anyhow::{Context, Result};
use clientdesk_core::config::Config;

pub fn path(config_path: &Path) {
    println!("{}", config_path.display());
    if !config_path.exists() {
        eprintln!("(not created yet; run `clientdesk config init`)");
    }
}

pub fn init(config_path: &Path) -> Result<()> {
    Config::init(config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    let written = Config::load_from(config_path)?;

    println!("Created config at {}", config_path.display());
    println!("Client registry: {}", written.api.base_url);
    println!("Point it elsewhere with `clientdesk config set-url <URL>`.");
    Ok(())
}

pub fn generate() -> Result<()> {
    print!("{}", Config::generate()?);
    Ok(())
}

/// Persists the registry URL. `active_override` is the `--api-url` value in
/// effect for this invocation, which keeps winning over the saved one.
pub fn set_url(config_path: &Path, url: &str, active_override: Option<&str>) -> Result<()> {
    Config::save_base_url_to(config_path, url)
        .with_context(|| format!("update {}", config_path.display()))?;

    println!("API URL set to {} in {}", url.trim(), config_path.display());
    if let Some(other) = active_override {
        eprintln!("Note: --api-url / CLIENTDESK_API_URL ({other}) still takes precedence.");
    }
    Ok(())
}
