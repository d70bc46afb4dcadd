//! Run-wide kernel configuration, persisted as TOML.
//!
//! ```toml
//! alpha = 0.5
//! beta = 2.718281828459045
//! mode = "insert"
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrich::EnrichmentMode;
use crate::kernel::{DEFAULT_ALPHA, DEFAULT_BETA, KernelParams};

/// Errors from loading or validating configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(clirel::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(clirel::config::write),
        help("Check that the directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(clirel::config::parse),
        help("Check the TOML syntax. Known keys are alpha, beta and mode.")
    )]
    Parse { path: String, message: String },

    #[error("invalid value for {key}: {value}")]
    #[diagnostic(
        code(clirel::config::invalid_value),
        help("alpha must lie in [0, 1]; beta must be finite and greater than zero.")
    )]
    InvalidValue { key: String, value: String },

    #[error("unknown enrichment mode: \"{name}\"")]
    #[diagnostic(
        code(clirel::config::unknown_mode),
        help("Valid enrichment modes are: spt, insert, suffix.")
    )]
    UnknownMode { name: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Kernel constants and the enrichment strategy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Weight of the entity kernel.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Fragment decay base.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Tree rewrite applied before kernel evaluation.
    #[serde(default)]
    pub mode: EnrichmentMode,
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}
fn default_beta() -> f64 {
    DEFAULT_BETA
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            mode: EnrichmentMode::default(),
        }
    }
}

impl KernelConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), alpha = config.alpha, beta = config.beta, mode = %config.mode, "loaded kernel config");
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidValue {
                key: "alpha".into(),
                value: self.alpha.to_string(),
            });
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "beta".into(),
                value: self.beta.to_string(),
            });
        }
        Ok(())
    }

    pub fn params(&self) -> KernelParams {
        KernelParams {
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.alpha, 0.5);
        assert_eq!(config.beta, std::f64::consts::E);
        assert_eq!(config.mode, EnrichmentMode::Trim);
        assert_eq!(config.params(), KernelParams::default());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config: KernelConfig = toml::from_str("mode = \"suffix\"").unwrap();
        assert_eq!(config.mode, EnrichmentMode::Suffix);
        assert_eq!(config.alpha, 0.5);

        let config: KernelConfig = toml::from_str("alpha = 0.25").unwrap();
        assert_eq!(config.alpha, 0.25);
        assert_eq!(config.mode, EnrichmentMode::Trim);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kernel.toml");
        let config = KernelConfig {
            alpha: 0.3,
            beta: 2.0,
            mode: EnrichmentMode::Insert,
        };
        config.save(&path).unwrap();
        assert_eq!(KernelConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.toml");
        std::fs::write(&path, "alpha = 1.5").unwrap();
        assert!(matches!(
            KernelConfig::load(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "alpha"
        ));

        std::fs::write(&path, "beta = -1.0").unwrap();
        assert!(matches!(
            KernelConfig::load(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "beta"
        ));
    }

    #[test]
    fn load_reports_parse_and_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.toml");
        std::fs::write(&path, "mode = \"sideways\"").unwrap();
        assert!(matches!(KernelConfig::load(&path), Err(ConfigError::Parse { .. })));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(KernelConfig::load(&missing), Err(ConfigError::Read { .. })));
    }
}
