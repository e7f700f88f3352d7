//! Loader configuration.
//!
//! Configuration can come from a TOML file, a TOML string, or the
//! `SPIRVCROSSJ_NATIVES_*` environment variables. Every field has a default, so
//! an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default name prefix of staging directories.
pub const DEFAULT_DIR_PREFIX: &str = "spirvcrossj-natives";

/// Environment variable overriding the staging root.
pub const ENV_STAGING_ROOT: &str = "SPIRVCROSSJ_NATIVES_TMPDIR";
/// Environment variable overriding the staging directory prefix.
pub const ENV_DIR_PREFIX: &str = "SPIRVCROSSJ_NATIVES_PREFIX";
/// Environment variable pointing at an on-disk resource directory.
pub const ENV_RESOURCE_DIR: &str = "SPIRVCROSSJ_NATIVES_RESOURCES";
/// Environment variable enabling the stale staging sweep.
pub const ENV_SWEEP: &str = "SPIRVCROSSJ_NATIVES_SWEEP";

/// Settings for a [`NativeLoader`](crate::NativeLoader).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Parent directory of staging directories (default: the system temp dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_root: Option<PathBuf>,

    /// Staging directory name prefix
    pub dir_prefix: String,

    /// Load resources from this directory instead of the embedded bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_dir: Option<PathBuf>,

    /// Remove stale staging directories left by earlier processes
    pub sweep_stale: bool,

    /// Age after which a foreign staging directory counts as stale
    pub stale_after_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            staging_root: None,
            dir_prefix: DEFAULT_DIR_PREFIX.to_string(),
            resource_dir: None,
            sweep_stale: false,
            stale_after_secs: 24 * 60 * 60,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build a configuration from the `SPIRVCROSSJ_NATIVES_*` environment variables.
    ///
    /// Invalid values are ignored with a warning and the default is kept.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_STAGING_ROOT).filter(|v| !v.is_empty()) {
            self.staging_root = Some(PathBuf::from(root));
        }
        if let Some(prefix) = lookup(ENV_DIR_PREFIX) {
            if validate_prefix(&prefix).is_ok() {
                self.dir_prefix = prefix;
            } else {
                tracing::warn!("Ignoring invalid {}: {:?}", ENV_DIR_PREFIX, prefix);
            }
        }
        if let Some(dir) = lookup(ENV_RESOURCE_DIR).filter(|v| !v.is_empty()) {
            self.resource_dir = Some(PathBuf::from(dir));
        }
        if let Some(sweep) = lookup(ENV_SWEEP) {
            match sweep.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sweep_stale = true,
                "0" | "false" | "no" | "off" | "" => self.sweep_stale = false,
                other => tracing::warn!("Ignoring invalid {}: {:?}", ENV_SWEEP, other),
            }
        }
        self
    }

    /// Check field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_prefix(&self.dir_prefix)
    }

    /// Directory under which staging directories are created.
    pub fn staging_root(&self) -> PathBuf {
        self.staging_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Stale threshold as a [`Duration`].
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Invalid("dir_prefix must not be empty".to_string()));
    }
    if prefix.contains(['/', '\\']) || prefix == "." || prefix == ".." {
        return Err(ConfigError::Invalid(format!(
            "dir_prefix must be a plain name: {:?}",
            prefix
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.dir_prefix, "spirvcrossj-natives");
        assert!(config.staging_root.is_none());
        assert!(!config.sweep_stale);
        assert_eq!(config.staging_root(), std::env::temp_dir());
        assert_eq!(config.stale_after(), Duration::from_secs(86400));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = LoaderConfig::from_toml_str("").unwrap();
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
staging_root = "/var/tmp/app"
dir_prefix = "app-natives"
resource_dir = "target/natives"
sweep_stale = true
stale_after_secs = 60
"#;
        let config = LoaderConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.staging_root, Some(PathBuf::from("/var/tmp/app")));
        assert_eq!(config.dir_prefix, "app-natives");
        assert_eq!(config.resource_dir, Some(PathBuf::from("target/natives")));
        assert!(config.sweep_stale);
        assert_eq!(config.stale_after(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        assert!(matches!(
            LoaderConfig::from_toml_str("dir_prefix = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LoaderConfig::from_toml_str("dir_prefix = \"a/b\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            LoaderConfig::from_toml_str("sweep_stale = \"maybe\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_STAGING_ROOT, "/scratch"),
            (ENV_DIR_PREFIX, "custom"),
            (ENV_RESOURCE_DIR, "/opt/natives"),
            (ENV_SWEEP, "yes"),
        ]
        .into_iter()
        .collect();

        let config = LoaderConfig::default()
            .with_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.staging_root(), PathBuf::from("/scratch"));
        assert_eq!(config.dir_prefix, "custom");
        assert_eq!(config.resource_dir, Some(PathBuf::from("/opt/natives")));
        assert!(config.sweep_stale);
    }

    #[test]
    fn test_env_invalid_values_keep_defaults() {
        let config = LoaderConfig::default().with_env_overrides(|key| match key {
            ENV_DIR_PREFIX => Some("../escape".to_string()),
            ENV_SWEEP => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config.dir_prefix, DEFAULT_DIR_PREFIX);
        assert!(!config.sweep_stale);
    }
}
