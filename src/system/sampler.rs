//! The background producer: samples a `MetricsSource`, keeps the chart
//! histories and publishes one immutable `Snapshot` per tick.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, error, info, warn};

use super::history::{DEFAULT_CAPACITY, HistorySet};
use super::rate::NetworkRates;
use super::snapshot::{Snapshot, SnapshotPublisher, SnapshotReader};
use super::source::{CounterSample, HostInfo, MemoryStats, MetricsSource};
use crate::error::{ConfigError, MetricsError, SamplerError};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// How long `shutdown` waits for the loop by default.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Checks an interval against the user-facing [0.5s, 5.0s] range.
pub fn validate_refresh_interval(interval: Duration) -> Result<Duration, ConfigError> {
    if interval < MIN_REFRESH_INTERVAL || interval > MAX_REFRESH_INTERVAL {
        return Err(ConfigError::invalid(
            "refresh_interval",
            format!(
                "{:.2}s is outside {:.1}s..={:.1}s",
                interval.as_secs_f64(),
                MIN_REFRESH_INTERVAL.as_secs_f64(),
                MAX_REFRESH_INTERVAL.as_secs_f64()
            ),
        ));
    }
    Ok(interval)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    refresh_interval: Duration,
    history_capacity: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SamplerSettings {
    /// Engine-level settings. Only requires a non-zero interval and a
    /// history of at least one point; user input goes through `Config`.
    pub fn new(refresh_interval: Duration, history_capacity: usize) -> Result<Self, ConfigError> {
        if refresh_interval.is_zero() {
            return Err(ConfigError::invalid(
                "refresh_interval",
                "must be greater than zero",
            ));
        }
        if history_capacity == 0 {
            return Err(ConfigError::invalid(
                "history_capacity",
                "must be at least 1",
            ));
        }
        Ok(Self {
            refresh_interval,
            history_capacity,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }
}

/// Everything read from the source in one tick, before derivation.
#[derive(Debug, Clone, Copy)]
struct TickReading {
    cpu_percent: f32,
    cpu_frequency_mhz: Option<f64>,
    memory: MemoryStats,
    counters: CounterSample,
    boot_time: Option<SystemTime>,
}

fn read_tick<S: MetricsSource>(
    source: &mut S,
    need_boot_time: bool,
) -> Result<TickReading, MetricsError> {
    let cpu_percent = source.cpu_percent()?;
    let cpu_frequency_mhz = source.cpu_frequency_mhz();
    let memory = source.memory_stats()?;
    let counters = source.network_counters()?;
    // Uptime reads as zero until boot time is known; the tick still publishes.
    let boot_time = if need_boot_time {
        match source.boot_time() {
            Ok(boot_time) => Some(boot_time),
            Err(err) => {
                debug!(error = %err, "boot time unavailable");
                None
            }
        }
    } else {
        None
    };
    Ok(TickReading {
        cpu_percent,
        cpu_frequency_mhz,
        memory,
        counters,
        boot_time,
    })
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Mutable state owned exclusively by the loop.
#[derive(Debug)]
struct SamplerState {
    tick: u64,
    history: HistorySet,
    prev_counters: Option<CounterSample>,
    boot_time: Option<SystemTime>,
    host: Arc<HostInfo>,
}

impl SamplerState {
    fn new(history: HistorySet) -> Self {
        Self {
            tick: 0,
            history,
            prev_counters: None,
            boot_time: None,
            host: Arc::new(HostInfo::default()),
        }
    }

    fn apply(&mut self, reading: TickReading, sampled_at: SystemTime) -> Snapshot {
        self.tick += 1;
        if let Some(boot_time) = reading.boot_time {
            self.boot_time = Some(boot_time);
        }

        let rates = match &self.prev_counters {
            Some(prev) => NetworkRates::between(prev, &reading.counters),
            None => NetworkRates::default(),
        };
        self.prev_counters = Some(reading.counters);

        let uptime = self
            .boot_time
            .and_then(|boot| sampled_at.duration_since(boot).ok())
            .unwrap_or_default();

        let cpu_percent = clamp_percent(reading.cpu_percent);
        let memory_percent = clamp_percent(reading.memory.percent);
        let network_percent = rates.percent();
        self.history.record(
            f64::from(cpu_percent),
            f64::from(memory_percent),
            network_percent,
        );

        Snapshot {
            tick: self.tick,
            cpu_percent,
            cpu_frequency_mhz: reading.cpu_frequency_mhz,
            memory_percent,
            memory_used_bytes: reading.memory.used_bytes,
            memory_total_bytes: reading.memory.total_bytes,
            network_receive_kbs: rates.receive_kbs,
            network_send_kbs: rates.send_kbs,
            network_percent,
            uptime,
            sampled_at,
            host: Arc::clone(&self.host),
            history: self.history.series(),
        }
    }
}

enum Step<T> {
    Done(T),
    Stop,
    Failed(SamplerError),
}

/// Resolves once stop has been requested or the handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *stop_rx.borrow_and_update();
        if stopped {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Runs `f` against the source on the blocking pool. A stop request wins
/// over an in-flight call; the call is then abandoned along with the source.
/// A panicking call loses the source and fails the loop.
async fn call_source<S, T, F>(
    source: &mut Option<S>,
    stop_rx: &mut watch::Receiver<bool>,
    f: F,
) -> Step<T>
where
    S: MetricsSource,
    T: Send + 'static,
    F: FnOnce(&mut S) -> T + Send + 'static,
{
    let Some(mut owned) = source.take() else {
        return Step::Stop;
    };
    let job = tokio::task::spawn_blocking(move || {
        let out = f(&mut owned);
        (owned, out)
    });

    tokio::select! {
        biased;
        _ = stop_requested(stop_rx) => {
            debug!("stop requested while a source call was in flight");
            Step::Stop
        }
        joined = job => match joined {
            Ok((owned, out)) => {
                *source = Some(owned);
                Step::Done(out)
            }
            Err(err) => {
                error!(error = %err, "metrics source call failed, sampling loop exits");
                Step::Failed(SamplerError::TaskFailed(format!("metrics source call: {err}")))
            }
        },
    }
}

struct SamplerTask<S> {
    source: Option<S>,
    state: SamplerState,
    publisher: SnapshotPublisher,
    interval_rx: watch::Receiver<Duration>,
    stop_rx: watch::Receiver<bool>,
}

impl<S: MetricsSource> SamplerTask<S> {
    async fn run(mut self) -> Result<(), SamplerError> {
        info!(
            interval_ms = self.interval_rx.borrow().as_millis() as u64,
            capacity = self.state.history.capacity(),
            "sampling loop started"
        );

        let primed = call_source(&mut self.source, &mut self.stop_rx, |source| {
            (source.host_info(), source.network_counters())
        })
        .await;
        match primed {
            Step::Done((host, counters)) => {
                self.state.host = Arc::new(host);
                match counters {
                    Ok(counters) => self.state.prev_counters = Some(counters),
                    Err(err) => warn!(error = %err, "no baseline network counters"),
                }
            }
            Step::Stop => {
                info!("sampling loop stopped before first tick");
                return Ok(());
            }
            Step::Failed(err) => return Err(err),
        }

        loop {
            // Read fresh so interval changes apply from the next wait on.
            let interval = *self.interval_rx.borrow();
            tokio::select! {
                biased;
                _ = stop_requested(&mut self.stop_rx) => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let need_boot_time = self.state.boot_time.is_none();
            let reading = match call_source(&mut self.source, &mut self.stop_rx, move |source| {
                read_tick(source, need_boot_time)
            })
            .await
            {
                Step::Done(reading) => reading,
                Step::Stop => break,
                Step::Failed(err) => return Err(err),
            };

            match reading {
                Ok(reading) => {
                    let span = debug_span!("sampler.tick", tick = self.state.tick + 1);
                    let snapshot = span.in_scope(|| {
                        let snapshot = self.state.apply(reading, SystemTime::now());
                        debug!(
                            cpu = snapshot.cpu_percent,
                            mem = snapshot.memory_percent,
                            rx_kbs = snapshot.network_receive_kbs,
                            tx_kbs = snapshot.network_send_kbs,
                            "tick sampled"
                        );
                        snapshot
                    });
                    self.publisher.publish(snapshot);
                }
                Err(err) => {
                    warn!(error = %err, "skipping tick, previous snapshot stays current");
                }
            }
        }

        info!(ticks = self.state.tick, "sampling loop stopped");
        Ok(())
    }
}

/// The producer, not yet running.
pub struct SamplingLoop<S> {
    source: S,
    settings: SamplerSettings,
}

impl<S: MetricsSource> SamplingLoop<S> {
    pub fn new(source: S, settings: SamplerSettings) -> Self {
        Self { source, settings }
    }

    /// Starts the loop on the current tokio runtime.
    pub fn spawn(self) -> SamplerHandle {
        let history = HistorySet::new(self.settings.history_capacity).unwrap_or_default();
        let publisher =
            SnapshotPublisher::new(Snapshot::initial(&history, Arc::new(HostInfo::default())));
        let reader = publisher.reader();
        let (interval_tx, interval_rx) = watch::channel(self.settings.refresh_interval);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = SamplerTask {
            source: Some(self.source),
            state: SamplerState::new(history),
            publisher,
            interval_rx,
            stop_rx,
        };

        SamplerHandle {
            reader,
            interval_tx,
            stop_tx,
            task: Some(tokio::spawn(task.run())),
        }
    }
}

/// Consumer-side control of a running loop. Dropping it stops the loop.
pub struct SamplerHandle {
    reader: SnapshotReader,
    interval_tx: watch::Sender<Duration>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<Result<(), SamplerError>>>,
}

impl SamplerHandle {
    pub fn current(&self) -> Arc<Snapshot> {
        self.reader.current()
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    pub fn refresh_interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Takes effect at the next inter-tick wait; the loop is not restarted.
    pub fn set_refresh_interval(&self, interval: Duration) -> Result<(), ConfigError> {
        let interval = validate_refresh_interval(interval)?;
        self.interval_tx.send_replace(interval);
        debug!(interval_ms = interval.as_millis() as u64, "refresh interval changed");
        Ok(())
    }

    /// Requests a stop. Safe to call any number of times.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Requests a stop and waits at most `timeout` for the loop to exit.
    /// A loop that already died on a source failure reports it here, once.
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<(), SamplerError> {
        self.stop();
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                self.task = None;
                joined.map_err(|err| SamplerError::TaskFailed(err.to_string()))?
            }
            Err(_) => Err(SamplerError::StopTimedOut(timeout)),
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs `future` to completion on a fresh current-thread runtime, then gives
/// blocking work still in flight (an abandoned source call) at most `grace`
/// before the runtime is torn down.
pub fn block_on_bounded<F: Future>(future: F, grace: Duration) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    Ok(output)
}
