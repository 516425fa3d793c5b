//! Configuration management for clientdesk.
//!
//! Loads configuration from ${CLIENTDESK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use toml_edit::{DocumentMut, Item, Table, value};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, run `cargo xtask update-default-config`.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Parses the embedded template and lays the values of `overlay` over it.
///
/// Comments and keys come from the template; any value present in
/// `overlay` wins. `what` names the overlay source in parse errors.
fn template_with(overlay: &str, what: &str) -> Result<DocumentMut> {
    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let upper: DocumentMut = overlay
        .parse()
        .with_context(|| format!("Failed to parse {what}"))?;

    overlay_table(doc.as_table_mut(), upper.as_table());
    Ok(doc)
}

/// Copies every item of `upper` onto `lower`, descending into tables that
/// exist on both sides.
fn overlay_table(lower: &mut Table, upper: &Table) {
    for (key, item) in upper.iter() {
        if item.is_none() {
            continue;
        }
        if let Item::Table(nested) = item
            && let Some(Item::Table(existing)) = lower.get_mut(key)
        {
            overlay_table(existing, nested);
            continue;
        }
        // Index assignment keeps the template's key decor (its comments).
        lower[key] = item.clone();
    }
}

pub mod paths {
    //! Path resolution for clientdesk configuration and data files.
    //!
    //! CLIENTDESK_HOME resolution order:
    //! 1. CLIENTDESK_HOME environment variable (if set)
    //! 2. ~/.config/clientdesk (default)

    use std::path::PathBuf;

    /// Returns the clientdesk home directory.
    pub fn clientdesk_home() -> PathBuf {
        if let Ok(home) = std::env::var("CLIENTDESK_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".clientdesk"),
            |h| h.join(".config").join("clientdesk"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        clientdesk_home().join("config.toml")
    }

    /// Returns the path to the persisted session.
    pub fn session_path() -> PathBuf {
        clientdesk_home().join("session.json")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        clientdesk_home().join("logs")
    }
}

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Request timeout in seconds (0 disables)
    pub timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Config::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `CLIENTDESK_LOG` is unset
    pub level: String,
    /// Mirror logs into a daily-rotated file under the home directory
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub log: LogConfig,
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:3333";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the API base URL with precedence: override > config > default.
    ///
    /// The override carries `--api-url` / `CLIENTDESK_API_URL`.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is not a valid absolute URL.
    pub fn effective_base_url(&self, override_url: Option<&str>) -> Result<String> {
        let candidates = [override_url, Some(self.api.base_url.as_str())];
        for candidate in candidates.into_iter().flatten() {
            let trimmed = candidate.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }
        Ok(Self::DEFAULT_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.api.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.api.timeout_secs)))
        }
    }

    /// Sets `api.base_url` in the config file at `path`.
    ///
    /// Whatever the file already holds is laid over the current template,
    /// so comments and newly added keys appear while user values survive.
    /// A missing file starts from the template alone.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be
    /// read, parsed or written.
    pub fn save_base_url_to(path: &Path, url: &str) -> Result<()> {
        let url = url.trim();
        validate_url(url)?;

        let existing = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config from {}", path.display()));
            }
        };

        let mut doc = template_with(&existing, &path.display().to_string())?;
        doc["api"]["base_url"] = value(url);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with the values in `Config::default()`.
    ///
    /// # Errors
    /// Returns an error if the template or the defaults fail to (de)serialize.
    pub fn generate() -> Result<String> {
        let defaults = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;
        Ok(template_with(&defaults, "generated config")?.to_string())
    }

    /// Replaces the file at `path` in one step: the content goes to a
    /// temp file in the same directory, which is then renamed over it.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let mut staged = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to stage config in {}", dir.display()))?;
        staged
            .write_all(content.as_bytes())
            .with_context(|| format!("Failed to write config for {}", path.display()))?;
        staged
            .persist(path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }
}

/// Validates that a base URL is well-formed and absolute.
fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    if parsed.cannot_be_a_base() {
        anyhow::bail!("Invalid API base URL: {url}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.base_url, Config::DEFAULT_BASE_URL);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[api]\nbase_url = \"https://crm.example.com\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api.base_url, "https://crm.example.com");
        assert_eq!(config.api.timeout_secs, 0);
        assert!(!config.log.file);
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[api\nbase_url = ").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("base_url = \"http://localhost:3333\""));
        assert!(contents.contains("# Request timeout"));
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_generate_matches_embedded_template_values() {
        let generated = Config::generate().unwrap();
        let parsed: Config = toml::from_str(&generated).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(generated.contains("# clientdesk configuration"));
    }

    #[test]
    fn test_save_base_url_preserves_other_values_and_comments() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[log]\nlevel = \"debug\"\n").unwrap();

        Config::save_base_url_to(&config_path, "https://crm.example.com/api").unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Base URL of the client management API."));
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api.base_url, "https://crm.example.com/api");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_save_base_url_keeps_unknown_user_keys() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[api]\ntimeout_secs = 9\nregion = \"eu\"\n\n[custom]\nflag = true\n",
        )
        .unwrap();

        Config::save_base_url_to(&config_path, "https://crm.example.com").unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("region = \"eu\""));
        assert!(contents.contains("[custom]"));
        assert!(contents.contains("# Request timeout"));
        assert_eq!(Config::load_from(&config_path).unwrap().api.timeout_secs, 9);
    }

    #[test]
    fn test_save_base_url_reports_malformed_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[api\n").unwrap();

        let err = Config::save_base_url_to(&config_path, "https://crm.example.com").unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "[api\n");
    }

    #[test]
    fn test_write_leaves_no_staging_files() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::init(&config_path).unwrap();
        Config::save_base_url_to(&config_path, "https://crm.example.com").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["config.toml"]);
    }

    #[test]
    fn test_save_base_url_rejects_invalid_url() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::save_base_url_to(&config_path, "not a url").is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_effective_base_url_precedence() {
        let mut config = Config::default();
        config.api.base_url = "https://from-config.example.com/".to_string();

        assert_eq!(
            config
                .effective_base_url(Some("http://127.0.0.1:9000"))
                .unwrap(),
            "http://127.0.0.1:9000"
        );
        assert_eq!(
            config.effective_base_url(Some("  ")).unwrap(),
            "https://from-config.example.com"
        );

        config.api.base_url = String::new();
        assert_eq!(
            config.effective_base_url(None).unwrap(),
            Config::DEFAULT_BASE_URL
        );
        assert!(config.effective_base_url(Some("nope")).is_err());
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), None);
        config.api.timeout_secs = 5;
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }
}
