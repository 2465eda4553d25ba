//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/jsqlon/config.toml)
//! 3. Environment variables (JSQLON_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::backup::{with_suffix, BACKUP_SUFFIX};

/// Environment variable prefix
const ENV_PREFIX: &str = "JSQLON";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// SQLite database kept in sync with its JSON backup
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Report what would happen without touching either file
    #[serde(default)]
    pub dry_run: bool,

    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            dry_run: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Configuration for a specific database with everything else defaulted
    pub fn for_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (JSQLON_DATABASE, JSQLON_DRY_RUN, JSQLON_LOG)
    /// 2. Config file (~/.config/jsqlon/config.toml or JSQLON_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATABASE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.database_path = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var(format!("{}_DRY_RUN", ENV_PREFIX)) {
            self.dry_run = val.eq_ignore_ascii_case("true") || val == "1";
        }

        if let Ok(val) = std::env::var(format!("{}_LOG", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }
    }

    /// Get the config file path
    ///
    /// Can be overridden with JSQLON_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jsqlon")
            .join("config.toml")
    }

    /// Path of the JSON backup: always the database path plus `.json`
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.database_path, BACKUP_SUFFIX)
    }
}

/// Get the default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jsqlon")
        .join("data.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &["JSQLON_DATABASE", "JSQLON_DRY_RUN", "JSQLON_LOG"];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.dry_run);
        assert_eq!(config.log_level, "info");
        assert!(config.database_path.ends_with("jsqlon/data.db"));
    }

    #[test]
    fn test_backup_path_follows_database() {
        let config = Config::for_database("/srv/app/store.sqlite");
        assert_eq!(
            config.backup_path(),
            PathBuf::from("/srv/app/store.sqlite.json")
        );
    }

    #[test]
    fn test_env_override_database() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("JSQLON_DATABASE", "/tmp/jsqlon-test.db");
        config.apply_env_overrides();

        assert_eq!(config.database_path, PathBuf::from("/tmp/jsqlon-test.db"));
        assert_eq!(config.backup_path(), PathBuf::from("/tmp/jsqlon-test.db.json"));
    }

    #[test]
    fn test_env_override_dry_run() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("JSQLON_DRY_RUN", "true");
        config.apply_env_overrides();
        assert!(config.dry_run);

        env::set_var("JSQLON_DRY_RUN", "0");
        config.apply_env_overrides();
        assert!(!config.dry_run);
    }

    #[test]
    fn test_env_override_log_level() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("JSQLON_LOG", "debug");
        config.apply_env_overrides();
        assert_eq!(config.log_level, "debug");

        // Empty string keeps the current value
        env::set_var("JSQLON_LOG", "");
        config.apply_env_overrides();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            database_path = "/custom/data.db"
            dry_run = true
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/custom/data.db"));
        assert!(config.dry_run);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_serialization() {
        let config = Config {
            database_path: PathBuf::from("/data/app.db"),
            dry_run: true,
            log_level: "warn".to_string(),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
