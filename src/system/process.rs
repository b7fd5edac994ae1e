use std::fmt;

use serde::Serialize;

/// Scheduler state of a process as reported by the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Sleeping,
    Idle,
    Stopped,
    Zombie,
    Dead,
    Unknown,
}

impl ProcessStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Sleeping => "sleeping",
            ProcessStatus::Idle => "idle",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Zombie => "zombie",
            ProcessStatus::Dead => "dead",
            ProcessStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<sysinfo::ProcessStatus> for ProcessStatus {
    fn from(status: sysinfo::ProcessStatus) -> Self {
        use sysinfo::ProcessStatus as Os;
        match status {
            Os::Run | Os::Waking | Os::Wakekill => ProcessStatus::Running,
            Os::Sleep | Os::UninterruptibleDiskSleep | Os::LockBlocked => ProcessStatus::Sleeping,
            Os::Idle | Os::Parked => ProcessStatus::Idle,
            Os::Stop | Os::Tracing => ProcessStatus::Stopped,
            Os::Zombie => ProcessStatus::Zombie,
            Os::Dead => ProcessStatus::Dead,
            _ => ProcessStatus::Unknown,
        }
    }
}

/// One row of the process table. Rows are re-read on every query; the pid is
/// the only key and may be reused by the OS between queries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub status: ProcessStatus,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f32, memory_percent: f32) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent,
            memory_percent,
            status: ProcessStatus::Running,
        }
    }

    pub fn with_status(mut self, status: ProcessStatus) -> Self {
        self.status = status;
        self
    }
}
