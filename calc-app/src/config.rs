//! `widget-calc.toml` settings.
//!
//! ```toml
//! log_level = "info"
//! log_file = "widget-calc.log"
//! default_tax_year = 2025
//! schedule_mode = "annual"
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "widget-calc.db"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use std::path::{Path, PathBuf};

use calc_core::ScheduleMode;
use calc_core::db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "widget-calc.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    /// Bare level or full `EnvFilter` directive. `RUST_LOG` wins when set.
    pub log_level: String,
    /// Log records are appended here in addition to stderr.
    pub log_file: Option<PathBuf>,
    /// Used by `tax` when `--year` is omitted; falls back to the newest loaded year.
    pub default_tax_year: Option<i32>,
    pub schedule_mode: ScheduleMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DbConfig {
                backend: "sqlite".to_string(),
                connection_string: "widget-calc.db".to_string(),
            },
            log_level: "warn".to_string(),
            log_file: None,
            default_tax_year: None,
            schedule_mode: ScheduleMode::Monthly,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Reads `explicit` when given (it must exist), else
    /// [`DEFAULT_CONFIG_FILE`] when present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_toml_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_toml_file(path)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn apply_overrides(
        &mut self,
        backend: Option<String>,
        db: Option<String>,
        log_level: Option<String>,
    ) {
        if let Some(backend) = backend {
            self.database.backend = backend;
        }
        if let Some(db) = db {
            self.database.connection_string = db;
        }
        if let Some(level) = log_level {
            self.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_database_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            schedule_mode = "annual"

            [database]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, "memory");
        assert_eq!(config.database.connection_string, ":memory:");
        assert_eq!(config.schedule_mode, ScheduleMode::Annual);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn full_file_round_trips() {
        let config = AppConfig::from_toml_str(
            r#"
            log_level = "debug"
            log_file = "calc.log"
            default_tax_year = 2024

            [database]
            backend = "sqlite"
            connection_string = "scenarios.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_file, Some(PathBuf::from("calc.log")));
        assert_eq!(config.default_tax_year, Some(2024));
        assert_eq!(config.database.connection_string, "scenarios.db");
    }

    #[test]
    fn unknown_schedule_mode_is_rejected() {
        let err = AppConfig::from_toml_str(r#"schedule_mode = "weekly""#).unwrap_err();

        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/widget-calc.toml"))).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = AppConfig::default();

        config.apply_overrides(Some("memory".to_string()), None, Some("debug".to_string()));

        assert_eq!(config.database.backend, "memory");
        assert_eq!(config.database.connection_string, "widget-calc.db");
        assert_eq!(config.log_level, "debug");
    }
}
