use std::time::{Duration, Instant, SystemTime};

use sysgauge::system::fake::FakeSource;
use sysgauge::system::sampler::{DEFAULT_STOP_TIMEOUT, SamplerSettings, SamplingLoop};

const CAPACITY: usize = 60;

async fn next_ticks(
    reader: &mut sysgauge::system::SnapshotReader,
    count: usize,
) -> Vec<std::sync::Arc<sysgauge::system::Snapshot>> {
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let snapshot = tokio::time::timeout(Duration::from_secs(2), reader.changed())
            .await
            .expect("no snapshot within 2s")
            .expect("publisher dropped");
        out.push(snapshot);
    }
    out
}

#[tokio::test]
async fn five_ticks_with_fixed_readings() {
    let source = FakeSource::fixed(37.5, 62.0);
    let calls = source.calls();
    let settings = SamplerSettings::new(Duration::from_millis(100), CAPACITY).unwrap();
    let mut handle = SamplingLoop::new(source, settings).spawn();
    let mut reader = handle.reader();

    assert_eq!(handle.current().history.cpu.len(), CAPACITY);

    let snapshots = next_ticks(&mut reader, 5).await;
    let mut last_tick = 0;
    for snapshot in &snapshots {
        assert!(snapshot.tick > last_tick);
        last_tick = snapshot.tick;
        assert!((snapshot.cpu_percent - 37.5).abs() < f32::EPSILON);
        assert!((snapshot.memory_percent - 62.0).abs() < f32::EPSILON);
        assert_eq!(snapshot.history.cpu.len(), CAPACITY);
        assert_eq!(snapshot.history.memory.len(), CAPACITY);
        assert_eq!(snapshot.history.network.len(), CAPACITY);
        assert_eq!(snapshot.network_receive_kbs, 0.0);
        assert_eq!(snapshot.network_send_kbs, 0.0);
    }

    let latest = handle.current();
    assert!((latest.cpu_percent - 37.5).abs() < f32::EPSILON);
    assert_eq!(latest.host.host_name.as_deref(), Some("fakehost"));
    assert!(latest.uptime >= Duration::from_secs(3 * 3600));

    // Newest values are right-aligned on top of the zero baseline.
    let cpu = &latest.history.cpu;
    assert_eq!(cpu[CAPACITY - 1], 37.5);
    assert_eq!(cpu[0], 0.0);

    // The sampler never enumerates processes.
    assert_eq!(calls.process_listings(), 0);

    let started = Instant::now();
    handle.shutdown(DEFAULT_STOP_TIMEOUT).await.unwrap();
    assert!(started.elapsed() < DEFAULT_STOP_TIMEOUT);
}

#[tokio::test]
async fn network_rates_follow_counter_growth() {
    // 100 ms between reads, 10 KiB per read => roughly 100 KB/s received.
    let source = FakeSource::fixed(1.0, 1.0).with_counter_step(10 * 1024, 0);
    let settings = SamplerSettings::new(Duration::from_millis(100), 8).unwrap();
    let mut handle = SamplingLoop::new(source, settings).spawn();
    let mut reader = handle.reader();

    let snapshots = next_ticks(&mut reader, 3).await;
    for snapshot in &snapshots {
        assert!(snapshot.network_receive_kbs > 0.0);
        assert!(snapshot.network_receive_kbs < 200.0);
        assert_eq!(snapshot.network_send_kbs, 0.0);
        assert!((0.0..=100.0).contains(&snapshot.network_percent));
    }

    handle.shutdown(DEFAULT_STOP_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn counter_reset_does_not_spike() {
    // Baseline, +4 KiB on tick 1, then the interface resets to 2 KiB on tick 2.
    let source = FakeSource::fixed(1.0, 1.0).with_counter_readings([
        (1_000_000, 500_000),
        (1_000_000 + 4096, 500_000 + 4096),
        (2048, 2048),
    ]);
    let settings = SamplerSettings::new(Duration::from_millis(100), 8).unwrap();
    let mut handle = SamplingLoop::new(source, settings).spawn();
    let mut reader = handle.reader();

    let snapshots = next_ticks(&mut reader, 2).await;
    let ticks: Vec<u64> = snapshots.iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![1, 2]);

    // 4 KiB over at least 100 ms.
    let grew = &snapshots[0];
    assert!(grew.network_receive_kbs > 0.0 && grew.network_receive_kbs <= 40.5);
    assert!(grew.network_send_kbs > 0.0 && grew.network_send_kbs <= 40.5);

    // The reset counts as 2 KiB transferred, not as an unsigned wrap.
    let reset = &snapshots[1];
    assert!(reset.network_receive_kbs > 0.0 && reset.network_receive_kbs <= 20.5);
    assert!(reset.network_send_kbs > 0.0 && reset.network_send_kbs <= 20.5);
    assert!(reset.network_percent < 5.0);

    handle.shutdown(DEFAULT_STOP_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn uptime_and_frequency_come_from_the_source() {
    let boot = SystemTime::now() - Duration::from_secs(90);
    let source = FakeSource::fixed(1.0, 1.0)
        .with_boot_time(Some(boot))
        .with_frequency(None);
    let settings = SamplerSettings::new(Duration::from_millis(100), 8).unwrap();
    let mut handle = SamplingLoop::new(source, settings).spawn();
    let mut reader = handle.reader();

    let snapshot = &next_ticks(&mut reader, 1).await[0];
    assert!(snapshot.uptime >= Duration::from_secs(90));
    assert!(snapshot.uptime < Duration::from_secs(100));
    assert_eq!(snapshot.cpu_frequency_mhz, None);

    handle.shutdown(DEFAULT_STOP_TIMEOUT).await.unwrap();
}

#[tokio::test]
async fn many_readers_see_the_same_latest_snapshot() {
    let settings = SamplerSettings::new(Duration::from_millis(50), 16).unwrap();
    let mut handle = SamplingLoop::new(FakeSource::demo(), settings).spawn();
    let mut first = handle.reader();
    let mut second = handle.reader();

    let a = next_ticks(&mut first, 2).await;
    let b = next_ticks(&mut second, 1).await;
    assert!(b[0].tick >= a[0].tick);

    handle.stop();
    handle.stop();
    handle.shutdown(DEFAULT_STOP_TIMEOUT).await.unwrap();

    // Readers keep the last snapshot after the loop is gone.
    let last = first.current();
    assert!(last.tick >= a[1].tick);
}

#[tokio::test]
async fn dropping_the_handle_stops_the_loop() {
    let source = FakeSource::fixed(1.0, 1.0);
    let calls = source.calls();
    let settings = SamplerSettings::new(Duration::from_millis(20), 4).unwrap();
    let handle = SamplingLoop::new(source, settings).spawn();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = calls.cpu_reads();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.cpu_reads(), settled);
}
