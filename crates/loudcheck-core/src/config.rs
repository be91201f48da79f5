//! Harness configuration
//!
//! Settings are read from an optional JSON file; command-line flags override
//! them. Every field has a default so partial files are accepted.

use crate::meter::ebur128_rs::Ebur128Backend;
use crate::meter::MeterBackend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

fn default_relative_tolerance() -> f64 {
    crate::DEFAULT_RELATIVE_TOLERANCE
}

fn default_passes() -> usize {
    1
}

/// Loudness library the harness drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The `ebur128` crate
    #[default]
    Ebur128,
    /// The system libebur128 C library
    LibEbur128,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Ebur128 => "ebur128",
            BackendKind::LibEbur128 => "libebur128",
        }
    }

    /// Whether this build can drive the backend
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Ebur128 => true,
            BackendKind::LibEbur128 => cfg!(feature = "libebur128"),
        }
    }

    /// Instantiate the backend
    pub fn make_backend(&self) -> Result<Box<dyn MeterBackend>, ConfigError> {
        match self {
            BackendKind::Ebur128 => Ok(Box::new(Ebur128Backend::new())),
            #[cfg(feature = "libebur128")]
            BackendKind::LibEbur128 => Ok(Box::new(
                crate::meter::libebur128::LibEbur128Backend::new(),
            )),
            #[cfg(not(feature = "libebur128"))]
            BackendKind::LibEbur128 => Err(ConfigError::BackendUnavailable(*self)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ebur128" => Ok(BackendKind::Ebur128),
            "libebur128" => Ok(BackendKind::LibEbur128),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Configuration problems, reported with exit code 2
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown backend: {0} (expected ebur128 or libebur128)")]
    UnknownBackend(String),

    #[error("Backend {0} is not compiled in (enable the libebur128 feature)")]
    BackendUnavailable(BackendKind),

    #[error("Relative tolerance must be a finite non-negative number, got {0}")]
    InvalidTolerance(f64),

    #[error("Pass count must be at least 1")]
    InvalidPasses,
}

/// Settings for one harness invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Library under test
    #[serde(default)]
    pub backend: BackendKind,
    /// Relative tolerance for consistency and cross-backend checks
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    /// Only run vectors whose name contains this substring
    #[serde(default)]
    pub filter: Option<String>,
    /// How many times to run the battery
    #[serde(default = "default_passes")]
    pub passes: usize,
    /// Where to write the JSON run report
    #[serde(default)]
    pub json_report: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            relative_tolerance: default_relative_tolerance(),
            filter: None,
            passes: default_passes(),
            json_report: None,
        }
    }
}

impl HarnessConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.relative_tolerance.is_finite() || self.relative_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.relative_tolerance));
        }
        if self.passes == 0 {
            return Err(ConfigError::InvalidPasses);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.backend, BackendKind::Ebur128);
        assert_eq!(config.relative_tolerance, 1e-4);
        assert_eq!(config.passes, 1);
        assert_eq!(config.filter, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"filter": "range"}"#;
        let config: HarnessConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.filter.as_deref(), Some("range"));
        assert_eq!(config.passes, 1);
        assert_eq!(config.backend, BackendKind::Ebur128);
    }

    #[test]
    fn test_backend_names() {
        let json = r#"{"backend": "libebur128"}"#;
        let config: HarnessConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend, BackendKind::LibEbur128);

        assert_eq!("EBUR128".parse::<BackendKind>().unwrap(), BackendKind::Ebur128);
        assert!(matches!(
            "r128gain".parse::<BackendKind>(),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_default_backend_is_available() {
        let backend = BackendKind::Ebur128.make_backend().unwrap();
        assert_eq!(backend.name(), "ebur128");
    }

    #[cfg(not(feature = "libebur128"))]
    #[test]
    fn test_libebur128_unavailable_without_feature() {
        assert!(!BackendKind::LibEbur128.is_available());
        assert!(matches!(
            BackendKind::LibEbur128.make_backend(),
            Err(ConfigError::BackendUnavailable(BackendKind::LibEbur128))
        ));
    }

    #[test]
    fn test_validation() {
        let config = HarnessConfig {
            passes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPasses)));

        let config = HarnessConfig {
            relative_tolerance: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("loudcheck.json");

        let config = HarnessConfig {
            backend: BackendKind::Ebur128,
            relative_tolerance: 1e-3,
            filter: Some("stereo".to_string()),
            passes: 2,
            json_report: Some(PathBuf::from("report.json")),
        };
        config.save(&path).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            HarnessConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            HarnessConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, r#"{"passes": 0}"#).unwrap();
        assert!(matches!(
            HarnessConfig::load(&invalid),
            Err(ConfigError::InvalidPasses)
        ));
    }
}
