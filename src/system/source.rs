use std::time::{Instant, SystemTime};

use serde::Serialize;

use crate::error::{MetricsError, ProcessError};
use crate::system::process::ProcessEntry;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryStats {
    pub percent: f32,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryStats {
    /// Derives the percentage from the byte counts. A zero total reads as 0%.
    pub fn from_bytes(used_bytes: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / total_bytes as f64 * 100.0) as f32
        };
        Self {
            percent,
            used_bytes,
            total_bytes,
        }
    }
}

/// Cumulative network byte counters observed at one instant. Replaced whole
/// on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterSample {
    pub received_bytes: u64,
    pub sent_bytes: u64,
    pub observed_at: Instant,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub host_name: Option<String>,
    pub os_name: Option<String>,
    pub os_release: Option<String>,
}

/// Raw, platform-facing metric queries.
///
/// Every call is a bounded blocking query. Implementations own whatever OS
/// handles they need, so calls take `&mut self`.
pub trait MetricsSource: Send + 'static {
    fn cpu_percent(&mut self) -> Result<f32, MetricsError>;

    /// Current CPU frequency, `None` when the platform does not expose it.
    fn cpu_frequency_mhz(&mut self) -> Option<f64>;

    fn memory_stats(&mut self) -> Result<MemoryStats, MetricsError>;

    fn network_counters(&mut self) -> Result<CounterSample, MetricsError>;

    fn boot_time(&mut self) -> Result<SystemTime, MetricsError>;

    fn host_info(&mut self) -> HostInfo {
        HostInfo::default()
    }

    /// Best-effort process table. Rows that could not be read come back as
    /// errors so callers decide whether to skip them.
    fn list_processes(&mut self) -> Vec<Result<ProcessEntry, ProcessError>>;

    fn terminate_process(&mut self, pid: u32) -> Result<(), ProcessError>;
}

impl<S: MetricsSource + ?Sized> MetricsSource for Box<S> {
    fn cpu_percent(&mut self) -> Result<f32, MetricsError> {
        (**self).cpu_percent()
    }

    fn cpu_frequency_mhz(&mut self) -> Option<f64> {
        (**self).cpu_frequency_mhz()
    }

    fn memory_stats(&mut self) -> Result<MemoryStats, MetricsError> {
        (**self).memory_stats()
    }

    fn network_counters(&mut self) -> Result<CounterSample, MetricsError> {
        (**self).network_counters()
    }

    fn boot_time(&mut self) -> Result<SystemTime, MetricsError> {
        (**self).boot_time()
    }

    fn host_info(&mut self) -> HostInfo {
        (**self).host_info()
    }

    fn list_processes(&mut self) -> Vec<Result<ProcessEntry, ProcessError>> {
        (**self).list_processes()
    }

    fn terminate_process(&mut self, pid: u32) -> Result<(), ProcessError> {
        (**self).terminate_process(pid)
    }
}
