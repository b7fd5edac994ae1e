use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A metric could not be read for the current tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("metric `{metric}` unavailable: {reason}")]
    Unavailable {
        metric: &'static str,
        reason: String,
    },
}

impl MetricsError {
    pub fn unavailable<S: Into<String>>(metric: &'static str, reason: S) -> Self {
        MetricsError::Unavailable {
            metric,
            reason: reason.into(),
        }
    }
}

/// Failures keyed by pid. All of them are recoverable and user-visible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("process {0} not found")]
    NotFound(u32),

    #[error("access denied for process {0}")]
    AccessDenied(u32),

    #[error("failed to signal process {pid}: {reason}")]
    Failed { pid: u32, reason: String },
}

impl ProcessError {
    pub fn pid(&self) -> u32 {
        match self {
            ProcessError::NotFound(pid) | ProcessError::AccessDenied(pid) => *pid,
            ProcessError::Failed { pid, .. } => *pid,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("sampling loop did not stop within {0:?}")]
    StopTimedOut(Duration),

    #[error("sampling task failed: {0}")]
    TaskFailed(String),
}
