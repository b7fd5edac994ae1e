use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};

use super::process::{ProcessEntry, ProcessStatus};
use super::source::{CounterSample, HostInfo, MemoryStats, MetricsSource};
use crate::error::{MetricsError, ProcessError};

/// Call counters shared with whoever built the fake, so tests can inspect a
/// source that has been moved into the sampler.
#[derive(Debug, Default)]
pub struct FakeCalls {
    cpu_reads: AtomicUsize,
    process_listings: AtomicUsize,
}

impl FakeCalls {
    pub fn cpu_reads(&self) -> usize {
        self.cpu_reads.load(Ordering::SeqCst)
    }

    pub fn process_listings(&self) -> usize {
        self.process_listings.load(Ordering::SeqCst)
    }
}

/// Scripted `MetricsSource` for tests and demo mode.
pub struct FakeSource {
    cpu_pattern: Vec<f32>,
    cpu_frequency_mhz: Option<f64>,
    memory: MemoryStats,
    counters: (u64, u64),
    counter_step: (u64, u64),
    counter_script: VecDeque<(u64, u64)>,
    boot_time: Option<SystemTime>,
    host: HostInfo,
    processes: Vec<Result<ProcessEntry, ProcessError>>,
    protected: HashSet<u32>,
    failures: VecDeque<bool>,
    cpu_delay: Option<Duration>,
    calls: Arc<FakeCalls>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::fixed(0.0, 0.0)
    }
}

impl FakeSource {
    /// Constant CPU and memory readings, counters that never move.
    pub fn fixed(cpu_percent: f32, memory_percent: f32) -> Self {
        let total = 16 * 1024 * 1024 * 1024u64;
        let used = (total as f64 * f64::from(memory_percent) / 100.0) as u64;
        Self {
            cpu_pattern: vec![cpu_percent],
            cpu_frequency_mhz: Some(2400.0),
            memory: MemoryStats {
                percent: memory_percent,
                used_bytes: used,
                total_bytes: total,
            },
            counters: (0, 0),
            counter_step: (0, 0),
            counter_script: VecDeque::new(),
            boot_time: Some(SystemTime::now() - Duration::from_secs(3 * 3600)),
            host: HostInfo {
                host_name: Some("fakehost".to_string()),
                os_name: Some("FakeOS".to_string()),
                os_release: Some("1.0".to_string()),
            },
            processes: Vec::new(),
            protected: HashSet::new(),
            failures: VecDeque::new(),
            cpu_delay: None,
            calls: Arc::new(FakeCalls::default()),
        }
    }

    /// Gently varying readings and a small process table for `--demo`.
    pub fn demo() -> Self {
        let cpu_pattern = (0..30)
            .map(|i| 35.0 + 25.0 * ((i as f32) * 0.21).sin())
            .collect();
        Self {
            cpu_pattern,
            ..Self::fixed(0.0, 42.0)
        }
        .with_counter_step(180 * 1024, 40 * 1024)
        .with_processes(vec![
            ProcessEntry::new(1, "init", 0.0, 0.1).with_status(ProcessStatus::Sleeping),
            ProcessEntry::new(412, "sshd", 0.1, 0.3).with_status(ProcessStatus::Sleeping),
            ProcessEntry::new(1337, "postgres", 12.5, 8.2),
            ProcessEntry::new(2048, "firefox", 31.0, 14.7),
            ProcessEntry::new(4096, "cargo", 88.0, 3.9),
        ])
    }

    pub fn with_cpu_pattern(mut self, pattern: Vec<f32>) -> Self {
        if !pattern.is_empty() {
            self.cpu_pattern = pattern;
        }
        self
    }

    pub fn with_frequency(mut self, mhz: Option<f64>) -> Self {
        self.cpu_frequency_mhz = mhz;
        self
    }

    /// Bytes added to the (received, sent) counters on every read.
    pub fn with_counter_step(mut self, received: u64, sent: u64) -> Self {
        self.counter_step = (received, sent);
        self
    }

    /// Exact (received, sent) values returned by the next reads, in order.
    /// Once used up, reads go back to adding the step to the last value.
    pub fn with_counter_readings(
        mut self,
        readings: impl IntoIterator<Item = (u64, u64)>,
    ) -> Self {
        self.counter_script.extend(readings);
        self
    }

    /// `None` makes every boot time read fail.
    pub fn with_boot_time(mut self, boot_time: Option<SystemTime>) -> Self {
        self.boot_time = boot_time;
        self
    }

    pub fn with_processes(mut self, processes: Vec<ProcessEntry>) -> Self {
        self.processes = processes.into_iter().map(Ok).collect();
        self
    }

    /// Adds a row that fails to read, as a process exiting mid-listing would.
    pub fn with_unreadable(mut self, error: ProcessError) -> Self {
        self.processes.push(Err(error));
        self
    }

    /// Pids the fake refuses to terminate with `AccessDenied`.
    pub fn with_protected(mut self, pids: impl IntoIterator<Item = u32>) -> Self {
        self.protected.extend(pids);
        self
    }

    /// One entry per CPU read: `true` makes that read fail.
    pub fn with_failures(mut self, script: impl IntoIterator<Item = bool>) -> Self {
        self.failures.extend(script);
        self
    }

    /// Makes every CPU read block for `delay`, simulating a stuck OS query.
    pub fn with_cpu_delay(mut self, delay: Duration) -> Self {
        self.cpu_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<FakeCalls> {
        Arc::clone(&self.calls)
    }
}

impl MetricsSource for FakeSource {
    fn cpu_percent(&mut self) -> Result<f32, MetricsError> {
        let n = self.calls.cpu_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.cpu_delay {
            std::thread::sleep(delay);
        }
        if self.failures.pop_front().unwrap_or(false) {
            return Err(MetricsError::unavailable("cpu_percent", "scripted failure"));
        }
        Ok(self.cpu_pattern[n % self.cpu_pattern.len()])
    }

    fn cpu_frequency_mhz(&mut self) -> Option<f64> {
        self.cpu_frequency_mhz
    }

    fn memory_stats(&mut self) -> Result<MemoryStats, MetricsError> {
        Ok(self.memory)
    }

    fn network_counters(&mut self) -> Result<CounterSample, MetricsError> {
        self.counters = match self.counter_script.pop_front() {
            Some(reading) => reading,
            None => (
                self.counters.0.wrapping_add(self.counter_step.0),
                self.counters.1.wrapping_add(self.counter_step.1),
            ),
        };
        Ok(CounterSample {
            received_bytes: self.counters.0,
            sent_bytes: self.counters.1,
            observed_at: Instant::now(),
        })
    }

    fn boot_time(&mut self) -> Result<SystemTime, MetricsError> {
        self.boot_time
            .ok_or_else(|| MetricsError::unavailable("boot_time", "scripted failure"))
    }

    fn host_info(&mut self) -> HostInfo {
        self.host.clone()
    }

    fn list_processes(&mut self) -> Vec<Result<ProcessEntry, ProcessError>> {
        self.calls.process_listings.fetch_add(1, Ordering::SeqCst);
        self.processes.clone()
    }

    fn terminate_process(&mut self, pid: u32) -> Result<(), ProcessError> {
        if self.protected.contains(&pid) {
            return Err(ProcessError::AccessDenied(pid));
        }
        let before = self.processes.len();
        self.processes
            .retain(|row| !matches!(row, Ok(entry) if entry.pid == pid));
        if self.processes.len() == before {
            return Err(ProcessError::NotFound(pid));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_pattern_cycles() {
        let mut source = FakeSource::fixed(0.0, 0.0).with_cpu_pattern(vec![1.0, 2.0]);
        let reads: Vec<f32> = (0..3).map(|_| source.cpu_percent().unwrap()).collect();
        assert_eq!(reads, vec![1.0, 2.0, 1.0]);
        assert_eq!(source.calls().cpu_reads(), 3);
    }

    #[test]
    fn scripted_failures_are_consumed_in_order() {
        let mut source = FakeSource::fixed(5.0, 0.0).with_failures([false, true]);
        assert!(source.cpu_percent().is_ok());
        assert!(source.cpu_percent().is_err());
        assert!(source.cpu_percent().is_ok());
    }

    #[test]
    fn counter_readings_run_before_the_step() {
        let mut source = FakeSource::fixed(0.0, 0.0)
            .with_counter_readings([(1_000, 10), (50, 5)])
            .with_counter_step(7, 1);
        let reads: Vec<(u64, u64)> = (0..3)
            .map(|_| {
                let sample = source.network_counters().unwrap();
                (sample.received_bytes, sample.sent_bytes)
            })
            .collect();
        assert_eq!(reads, vec![(1_000, 10), (50, 5), (57, 6)]);
    }

    #[test]
    fn demo_table_mixes_statuses() {
        let rows = FakeSource::demo().list_processes();
        let sleeping = rows
            .iter()
            .flatten()
            .filter(|p| p.status == ProcessStatus::Sleeping)
            .count();
        assert_eq!(rows.len(), 5);
        assert_eq!(sleeping, 2);
    }

    #[test]
    fn missing_boot_time_is_an_error() {
        let mut source = FakeSource::fixed(0.0, 0.0).with_boot_time(None);
        assert!(source.boot_time().is_err());
    }

    #[test]
    fn terminate_removes_row_once() {
        let mut source =
            FakeSource::fixed(0.0, 0.0).with_processes(vec![ProcessEntry::new(5, "a", 0.0, 0.0)]);
        assert_eq!(source.terminate_process(5), Ok(()));
        assert_eq!(source.terminate_process(5), Err(ProcessError::NotFound(5)));
    }
}
