//! Configuration schema for containme
//!
//! Configuration is stored at `~/.config/containme/config.toml`

use crate::spec::{DEFAULT_SPEC_FILE, DEFAULT_STEP_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container runtime selection
    pub runtime: RuntimeConfig,

    /// Build defaults
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Container runtime settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// "docker" or "podman"; empty to detect
    pub binary: String,
}

/// Build defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Timeout for steps that don't set one
    pub default_timeout_secs: u64,

    /// State directory, relative to the build working directory
    pub state_dir: String,

    /// Build spec file used when --file is not given
    pub spec_file: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            state_dir: ".containme".to_string(),
            spec_file: DEFAULT_SPEC_FILE.to_string(),
        }
    }
}

impl BuildConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[build]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.build.default_timeout_secs, 600);
        assert_eq!(config.build.state_dir, ".containme");
        assert!(config.runtime.binary.is_empty());
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [runtime]
            binary = "podman"

            [build]
            default_timeout_secs = 1200
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.runtime.binary, "podman");
        assert_eq!(config.build.default_timeout(), Duration::from_secs(1200));
        assert_eq!(config.build.spec_file, "containme.yaml"); // default preserved
    }
}
