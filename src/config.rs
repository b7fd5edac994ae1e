use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::system::query::{DEFAULT_LIST_LIMIT, SortKey};
use crate::system::sampler::{SamplerSettings, validate_refresh_interval};

pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub processes: ProcessesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub refresh_interval_secs: f64,
    pub history_capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            refresh_interval_secs: 1.0,
            history_capacity: 60,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub list_limit: usize,
    pub default_sort: String,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        ProcessesConfig {
            list_limit: DEFAULT_LIST_LIMIT,
            default_sort: "cpu".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "warn".to_string(),
        }
    }
}

/// Settings after validation; everything the binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub sampler: SamplerSettings,
    pub list_limit: usize,
    pub default_sort: SortKey,
    pub log_level: String,
}

impl Config {
    /// Rejects out-of-range values rather than clamping them.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let secs = self.sampling.refresh_interval_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::invalid(
                "refresh_interval",
                format!("{secs} is not a positive number of seconds"),
            ));
        }
        let interval = validate_refresh_interval(Duration::from_secs_f64(secs))?;
        let sampler = SamplerSettings::new(interval, self.sampling.history_capacity)?;

        if self.processes.list_limit == 0 {
            return Err(ConfigError::invalid("list_limit", "must be at least 1"));
        }
        let default_sort = self
            .processes
            .default_sort
            .parse::<SortKey>()
            .map_err(|reason| ConfigError::invalid("default_sort", reason))?;

        let log_level = self.logging.level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level `{}`", self.logging.level),
            ));
        }

        Ok(ValidatedConfig {
            sampler,
            list_limit: self.processes.list_limit,
            default_sort,
            log_level,
        })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysgauge").join("config.toml"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Ok(Config::default()),
    }
}

/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_config_from_path(path: &Path) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
