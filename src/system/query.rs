//! On-demand process browsing: filter, sort, truncate, terminate.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use super::process::ProcessEntry;
use super::source::MetricsSource;
use crate::error::ProcessError;

pub const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Highest CPU first.
    #[default]
    Cpu,
    /// Highest memory first.
    Memory,
    /// Case-insensitive A to Z.
    Name,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Cpu => "CPU",
            SortKey::Memory => "Memory",
            SortKey::Name => "Name",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(SortKey::Cpu),
            "memory" | "mem" => Ok(SortKey::Memory),
            "name" => Ok(SortKey::Name),
            other => Err(format!("unknown sort key `{other}` (expected cpu, memory or name)")),
        }
    }
}

/// Filter, sort and truncate a freshly read process table. Unreadable rows
/// are dropped.
pub fn select_processes<I>(rows: I, filter: &str, sort: SortKey, limit: usize) -> Vec<ProcessEntry>
where
    I: IntoIterator<Item = Result<ProcessEntry, ProcessError>>,
{
    let needle = filter.to_lowercase();
    let mut matched: Vec<ProcessEntry> = rows
        .into_iter()
        .filter_map(|row| match row {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(pid = err.pid(), error = %err, "skipping unreadable process");
                None
            }
        })
        .filter(|entry| needle.is_empty() || entry.name.to_lowercase().contains(&needle))
        .collect();

    // Stable sorts: ties keep table order.
    match sort {
        SortKey::Cpu => matched.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent)),
        SortKey::Memory => matched.sort_by(|a, b| b.memory_percent.total_cmp(&a.memory_percent)),
        SortKey::Name => matched.sort_by_cached_key(|entry| entry.name.to_lowercase()),
    }

    matched.truncate(limit);
    matched
}

/// Owns its own `MetricsSource`, separate from the sampler's, so every call
/// reads a fresh table and nothing is shared with the sampling loop.
pub struct ProcessQueryEngine<S> {
    source: S,
    default_limit: usize,
}

impl<S: MetricsSource> ProcessQueryEngine<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            default_limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn list(&mut self, filter: &str, sort: SortKey, limit: usize) -> Vec<ProcessEntry> {
        let rows = self.source.list_processes();
        let total = rows.len();
        let selected = select_processes(rows, filter, sort, limit);
        debug!(total, shown = selected.len(), %sort, filter, "process query");
        selected
    }

    /// `list` with the configured display cap.
    pub fn list_default(&mut self, filter: &str, sort: SortKey) -> Vec<ProcessEntry> {
        self.list(filter, sort, self.default_limit)
    }

    pub fn terminate(&mut self, pid: u32) -> Result<(), ProcessError> {
        self.source.terminate_process(pid)
    }
}
