//! Throughput derived from cumulative byte counters.

use std::time::Instant;

use crate::system::source::CounterSample;

/// Combined throughput (KB/s) that maps to 100% on the history chart.
/// 1 MB/s combined is full scale; this is fixed and not configurable.
pub const NETWORK_FULL_SCALE_KBS: f64 = 1024.0;

/// Rate in KB/s between two readings of a monotonic counter.
///
/// A counter that went backwards is treated as reset to zero, so the delta is
/// the current reading. Non-positive elapsed time yields 0.
pub fn rate_kbs(prev_count: u64, curr_count: u64, prev_at: Instant, curr_at: Instant) -> f64 {
    let Some(elapsed) = curr_at.checked_duration_since(prev_at) else {
        return 0.0;
    };
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }

    let delta = if curr_count < prev_count {
        curr_count
    } else {
        curr_count - prev_count
    };

    let rate = delta as f64 / secs / 1024.0;
    if rate.is_finite() { rate.max(0.0) } else { 0.0 }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NetworkRates {
    pub receive_kbs: f64,
    pub send_kbs: f64,
}

impl NetworkRates {
    pub fn between(prev: &CounterSample, curr: &CounterSample) -> Self {
        Self {
            receive_kbs: rate_kbs(
                prev.received_bytes,
                curr.received_bytes,
                prev.observed_at,
                curr.observed_at,
            ),
            send_kbs: rate_kbs(
                prev.sent_bytes,
                curr.sent_bytes,
                prev.observed_at,
                curr.observed_at,
            ),
        }
    }

    pub fn total_kbs(&self) -> f64 {
        self.receive_kbs + self.send_kbs
    }

    /// Combined throughput as a chart percentage, capped at 100.
    pub fn percent(&self) -> f64 {
        throughput_percent(self.receive_kbs, self.send_kbs)
    }
}

pub fn throughput_percent(receive_kbs: f64, send_kbs: f64) -> f64 {
    let total = receive_kbs + send_kbs;
    if !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    (total / (NETWORK_FULL_SCALE_KBS / 100.0)).min(100.0)
}
