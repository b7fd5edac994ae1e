use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::sync::watch;

use super::history::{HistorySeries, HistorySet};
use super::source::HostInfo;

/// Everything derived from one sampling tick. Never mutated after publish;
/// the next tick builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// 0 for the placeholder published before the first tick.
    pub tick: u64,
    pub cpu_percent: f32,
    pub cpu_frequency_mhz: Option<f64>,
    pub memory_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub network_receive_kbs: f64,
    pub network_send_kbs: f64,
    pub network_percent: f64,
    pub uptime: Duration,
    pub sampled_at: SystemTime,
    pub host: Arc<HostInfo>,
    pub history: HistorySeries,
}

impl Snapshot {
    /// Zeroed snapshot with a full-width zero history.
    pub fn initial(history: &HistorySet, host: Arc<HostInfo>) -> Self {
        Self {
            tick: 0,
            cpu_percent: 0.0,
            cpu_frequency_mhz: None,
            memory_percent: 0.0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            network_receive_kbs: 0.0,
            network_send_kbs: 0.0,
            network_percent: 0.0,
            uptime: Duration::ZERO,
            sampled_at: SystemTime::now(),
            host,
            history: history.series(),
        }
    }

    pub fn network_total_kbs(&self) -> f64 {
        self.network_receive_kbs + self.network_send_kbs
    }
}

/// Producer side of the snapshot handoff. Publishing swaps the shared
/// pointer; readers never see a partially built snapshot.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    pub fn new(initial: Snapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Replaces the current snapshot. Works with or without live readers.
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer handle. Cheap to clone; each clone tracks its own "seen" marker.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotReader {
    /// Latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Waits for a snapshot newer than the last one this reader observed and
    /// returns it. `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}
