//! Runtime configuration for core callers (FFI and CLI).
//!
//! # Responsibility
//! - Resolve database path, day-boundary zone and logging settings from
//!   `WEARLOG_*` environment variables.
//!
//! # Invariants
//! - Blank values count as unset.
//! - Invalid values are errors; they never fall back to defaults silently.

use crate::logging::default_log_level;
use crate::model::day::{DayBoundaryZone, UnknownZoneError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "WEARLOG_DB_PATH";
pub const ENV_DAY_ZONE: &str = "WEARLOG_DAY_ZONE";
pub const ENV_LOG_LEVEL: &str = "WEARLOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WEARLOG_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "wearlog.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidDayZone { variable: &'static str, source: UnknownZoneError },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDayZone { variable, source } => write!(f, "{variable}: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDayZone { source, .. } => Some(source),
        }
    }
}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub day_zone: DayBoundaryZone,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            day_zone: DayBoundaryZone::Local,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name
    /// to its raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = value(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(zone) = value(ENV_DAY_ZONE) {
            config.day_zone = zone
                .parse()
                .map_err(|source| ConfigError::InvalidDayZone {
                    variable: ENV_DAY_ZONE,
                    source,
                })?;
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = value(ENV_LOG_DIR).map(PathBuf::from);
        Ok(config)
    }
}
