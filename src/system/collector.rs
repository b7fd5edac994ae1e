use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use sysinfo::{Networks, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

use super::kill::terminate_process;
use super::process::{ProcessEntry, ProcessStatus};
use super::source::{CounterSample, HostInfo, MemoryStats, MetricsSource};
use crate::error::{MetricsError, ProcessError};

/// `MetricsSource` backed by sysinfo.
pub struct SysinfoSource {
    sys: System,
    networks: Networks,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Usage figures are deltas between refreshes, so prime them once.
        sys.refresh_memory();
        sys.refresh_cpu_all();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let networks = Networks::new_with_refreshed_list();
        SysinfoSource { sys, networks }
    }
}

impl MetricsSource for SysinfoSource {
    fn cpu_percent(&mut self) -> Result<f32, MetricsError> {
        self.sys.refresh_cpu_usage();
        if self.sys.cpus().is_empty() {
            return Err(MetricsError::unavailable("cpu_percent", "no CPUs reported"));
        }
        Ok(self.sys.global_cpu_usage())
    }

    fn cpu_frequency_mhz(&mut self) -> Option<f64> {
        self.sys.refresh_cpu_frequency();
        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return None;
        }
        let sum: u64 = cpus.iter().map(|cpu| cpu.frequency()).sum();
        let avg = sum as f64 / cpus.len() as f64;
        (avg > 0.0).then_some(avg)
    }

    fn memory_stats(&mut self) -> Result<MemoryStats, MetricsError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(MetricsError::unavailable(
                "memory_stats",
                "total memory reported as zero",
            ));
        }
        Ok(MemoryStats::from_bytes(self.sys.used_memory(), total))
    }

    fn network_counters(&mut self) -> Result<CounterSample, MetricsError> {
        self.networks.refresh(true);
        let (received_bytes, sent_bytes) =
            self.networks
                .values()
                .fold((0u64, 0u64), |(rx, tx), data| {
                    (
                        rx.saturating_add(data.total_received()),
                        tx.saturating_add(data.total_transmitted()),
                    )
                });
        Ok(CounterSample {
            received_bytes,
            sent_bytes,
            observed_at: Instant::now(),
        })
    }

    fn boot_time(&mut self) -> Result<SystemTime, MetricsError> {
        match System::boot_time() {
            0 => Err(MetricsError::unavailable("boot_time", "boot time unknown")),
            secs => Ok(UNIX_EPOCH + Duration::from_secs(secs)),
        }
    }

    fn host_info(&mut self) -> HostInfo {
        HostInfo {
            host_name: System::host_name(),
            os_name: System::long_os_version().or_else(System::name),
            os_release: System::kernel_version(),
        }
    }

    fn list_processes(&mut self) -> Vec<Result<ProcessEntry, ProcessError>> {
        self.sys.refresh_memory();
        let count = self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        trace!(count, "refreshed process table");

        let total_memory = self.sys.total_memory();
        self.sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                let pid = pid.as_u32();
                let name = process.name().to_string_lossy().to_string();
                if name.is_empty() {
                    return Err(ProcessError::AccessDenied(pid));
                }
                let memory_percent = if total_memory == 0 {
                    0.0
                } else {
                    (process.memory() as f64 / total_memory as f64 * 100.0) as f32
                };
                Ok(ProcessEntry {
                    pid,
                    name,
                    cpu_percent: process.cpu_usage(),
                    memory_percent,
                    status: ProcessStatus::from(process.status()),
                })
            })
            .collect()
    }

    fn terminate_process(&mut self, pid: u32) -> Result<(), ProcessError> {
        terminate_process(&mut self.sys, pid)
    }
}
