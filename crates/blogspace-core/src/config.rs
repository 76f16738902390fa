//! Configuration management for the BlogSpace client.
//!
//! Loads configuration from ${BLOGSPACE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable that overrides `api_base_url`.
pub const API_URL_ENV: &str = "BLOGSPACE_API_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for BlogSpace configuration and data files.
    //!
    //! BLOGSPACE_HOME resolution order:
    //! 1. BLOGSPACE_HOME environment variable (if set)
    //! 2. ~/.config/blogspace (default)

    use std::path::PathBuf;

    /// Returns the BlogSpace home directory.
    pub fn blogspace_home() -> PathBuf {
        if let Ok(home) = std::env::var("BLOGSPACE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".blogspace"),
            |h| h.join(".config").join("blogspace"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        blogspace_home().join("config.toml")
    }

    /// Returns the path to the persisted session record.
    pub fn session_path() -> PathBuf {
        blogspace_home().join("session.json")
    }

    /// Returns the directory that receives log files.
    pub fn logs_dir() -> PathBuf {
        blogspace_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the REST API; resource paths are joined underneath it
    pub api_base_url: String,

    /// Timeout for a whole HTTP exchange in seconds (0 disables)
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection in seconds (0 disables)
    pub connect_timeout_secs: u64,

    /// Default tracing filter directive for the log file
    pub log_filter: String,
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_LOG_FILTER: &str = "info";

    /// Loads configuration from the default config path, then applies
    /// environment overrides.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.override_api_base_url(&url);
        }
        Ok(config)
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

    /// Replaces the API base URL unless the override is blank.
    pub fn override_api_base_url(&mut self, url: &str) {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            self.api_base_url = trimmed.to_string();
        }
    }

    /// Returns the parsed API base URL, normalized to end with `/` so that
    /// relative resource paths resolve underneath it.
    ///
    /// # Errors
    /// Returns an error if the configured value is not an absolute URL.
    pub fn api_base(&self) -> Result<Url> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("Invalid api_base_url '{}'", self.api_base_url))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
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

    /// Saves only the `api_base_url` field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be updated.
    pub fn save_api_base_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        Url::parse(url.trim()).with_context(|| format!("Invalid API URL '{url}'"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api_base_url"] = value(url.trim());

        Self::write_config(path, &doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: Self::DEFAULT_CONNECT_TIMEOUT_SECS,
            log_filter: Self::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Config loading: missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000/api/");
    }

    /// Config loading: partial config merges with defaults.
    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "request_timeout_secs = 5\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.api_base_url, Config::DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("api_base_url ="));
        assert!(contents.contains("# Root of the REST API"));
    }

    /// Config init: fails if file exists (no silent overwrite).
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_zero_timeouts_disable() {
        let config = Config {
            request_timeout_secs: 0,
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.connect_timeout(), None);
    }

    #[test]
    fn test_api_base_gets_trailing_slash() {
        let config = Config {
            api_base_url: "http://localhost:9000/api".to_string(),
            ..Default::default()
        };
        let base = config.api_base().unwrap();
        assert_eq!(base.as_str(), "http://localhost:9000/api/");
        assert_eq!(
            base.join("auth/login/").unwrap().as_str(),
            "http://localhost:9000/api/auth/login/"
        );
    }

    #[test]
    fn test_invalid_api_base_is_error() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.api_base().is_err());
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = Config::default();
        config.override_api_base_url("   ");
        assert_eq!(config.api_base_url, Config::DEFAULT_API_BASE_URL);

        config.override_api_base_url("http://example.test/api/");
        assert_eq!(config.api_base_url, "http://example.test/api/");
    }

    /// Saving the URL keeps the template comments and other user values.
    #[test]
    fn test_save_api_base_url_preserves_user_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "request_timeout_secs = 7\n").unwrap();

        Config::save_api_base_url_to(&config_path, "https://blog.example.com/api/").unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Root of the REST API"));

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api_base_url, "https://blog.example.com/api/");
        assert_eq!(config.request_timeout_secs, 7);
    }

    #[test]
    fn test_save_api_base_url_rejects_garbage() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::save_api_base_url_to(&config_path, "::nope::").is_err());
        assert!(!config_path.exists());
    }
}
