//! Engine configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/margin/config.toml)
//! 3. Environment variables (MARGIN_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "MARGIN";

/// Location id used when none is configured
pub const DEFAULT_LOCATION: &str = "page";

/// Which engine behaviors are switched on
///
/// One engine serves read-only pages, editable pages, and pages where
/// highlighting sits behind a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Selections create drafts and unsaved edits are guarded by a confirmation
    #[serde(default = "default_true")]
    pub editable: bool,

    /// Report boundary changes so search-term highlighting can redraw
    #[serde(default)]
    pub search_integration: bool,

    /// Stay inert while the snapshot's feature flag is off
    #[serde(default)]
    pub gated_by_feature_flag: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            editable: true,
            search_integration: false,
            gated_by_feature_flag: false,
        }
    }
}

impl Capabilities {
    /// Read-only overlay: no drafts, no confirmations
    pub fn read_only() -> Self {
        Self {
            editable: false,
            ..Self::default()
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine capabilities
    #[serde(default)]
    pub capabilities: Capabilities,

    /// Location id stamped on highlights created from drafts
    #[serde(default)]
    pub location_id: Option<String>,

    /// Log file for CLI logging (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MARGIN_EDITABLE, MARGIN_SEARCH_INTEGRATION,
    ///    MARGIN_FEATURE_GATE, MARGIN_LOCATION)
    /// 2. Config file (~/.config/margin/config.toml or MARGIN_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
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
        if let Some(val) = env_flag("EDITABLE") {
            self.capabilities.editable = val;
        }

        if let Some(val) = env_flag("SEARCH_INTEGRATION") {
            self.capabilities.search_integration = val;
        }

        if let Some(val) = env_flag("FEATURE_GATE") {
            self.capabilities.gated_by_feature_flag = val;
        }

        // MARGIN_LOCATION
        if let Ok(val) = std::env::var(format!("{}_LOCATION", ENV_PREFIX)) {
            self.location_id = if val.is_empty() { None } else { Some(val) };
        }
    }

    /// Location id for new highlights
    pub fn location(&self) -> &str {
        self.location_id.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MARGIN_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("margin")
            .join("config.toml")
    }
}

/// Read a boolean MARGIN_* variable ("true"/"1" are true, anything else false)
fn env_flag(name: &str) -> Option<bool> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name))
        .ok()
        .map(|val| val.eq_ignore_ascii_case("true") || val == "1")
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

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

    const ENV_VARS: &[&str] = &[
        "MARGIN_EDITABLE",
        "MARGIN_SEARCH_INTEGRATION",
        "MARGIN_FEATURE_GATE",
        "MARGIN_LOCATION",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.capabilities.editable);
        assert!(!config.capabilities.search_integration);
        assert!(!config.capabilities.gated_by_feature_flag);
        assert_eq!(config.location(), DEFAULT_LOCATION);
    }

    #[test]
    fn test_env_override_capabilities() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("MARGIN_EDITABLE", "false");
        env::set_var("MARGIN_SEARCH_INTEGRATION", "1");
        env::set_var("MARGIN_FEATURE_GATE", "TRUE");
        config.apply_env_overrides();

        assert!(!config.capabilities.editable);
        assert!(config.capabilities.search_integration);
        assert!(config.capabilities.gated_by_feature_flag);
    }

    #[test]
    fn test_env_override_location() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("MARGIN_LOCATION", "chapter-2");
        config.apply_env_overrides();
        assert_eq!(config.location(), "chapter-2");

        // Empty string clears it
        env::set_var("MARGIN_LOCATION", "");
        config.apply_env_overrides();
        assert!(config.location_id.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            location_id = "page-12"

            [capabilities]
            editable = false
            search_integration = true
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.location(), "page-12");
        assert!(!config.capabilities.editable);
        assert!(config.capabilities.search_integration);
        assert!(!config.capabilities.gated_by_feature_flag);
    }

    #[test]
    fn test_missing_capabilities_use_defaults() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str("[capabilities]\n").unwrap();
        assert_eq!(config.capabilities, Capabilities::default());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            capabilities: Capabilities::read_only(),
            location_id: Some("ch-1".to_string()),
            log_file: None,
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.capabilities, Capabilities::read_only());
        assert_eq!(loaded.location(), "ch-1");
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/margin.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.capabilities, Capabilities::default());
    }
}
