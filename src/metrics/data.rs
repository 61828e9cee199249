//! Data structures for host health metrics.
//!
//! Raw samples are unprocessed OS counter readings and only mean something
//! when compared with an earlier reading of the same kind. [`HealthMetrics`]
//! is the derived record the sampler publishes, and [`HealthReport`] is its
//! wire form.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// CPU tick counters summed over every logical core at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCpuSample {
    /// Ticks spent idle
    pub idle_ticks: u64,
    /// Ticks spent in every category, idle included
    pub total_ticks: u64,
}

/// Interface byte counters summed over every non-loopback interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNetworkSample {
    /// Bytes received
    pub received_bytes: u64,
    /// Bytes transmitted
    pub transmitted_bytes: u64,
}

/// What the selected platform source is able to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Root filesystem usage can be read
    pub disk: bool,
    /// Interface byte counters can be read
    pub network: bool,
}

/// The single published record of derived host health values.
///
/// Every field holds the most recent successfully computed value. A failed
/// computation leaves its field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// CPU usage percentage (0.0 to 100.0)
    pub cpu_percent: f64,
    /// Memory usage percentage (0.0 to 100.0)
    pub memory_percent: f64,
    /// Root filesystem usage percentage (0.0 to 100.0)
    pub disk_percent: f64,
    /// Combined receive and transmit rate in megabits per second, `None`
    /// while unavailable or not yet computed
    pub network_mbps: Option<f64>,
}

/// Wire representation served by `GET /health` and pushed with every
/// `health-update` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    /// `0` when the rate is unavailable on this host
    pub network: f64,
}

impl HealthMetrics {
    /// Convert into the four-field wire shape.
    pub fn report(&self) -> HealthReport {
        HealthReport {
            cpu: self.cpu_percent,
            memory: self.memory_percent,
            disk: self.disk_percent,
            network: self.network_mbps.unwrap_or(0.0),
        }
    }
}

impl From<HealthMetrics> for HealthReport {
    fn from(metrics: HealthMetrics) -> Self {
        metrics.report()
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// CPU usage between two raw samples.
///
/// Returns `None` when the total tick count did not advance, which covers the
/// first tick, a stalled clock and counter resets. Deltas are taken in signed
/// space so a wrapped idle counter still clamps into `[0, 100]`.
pub fn cpu_usage_between(prev: RawCpuSample, curr: RawCpuSample) -> Option<f64> {
    let total_delta = i128::from(curr.total_ticks) - i128::from(prev.total_ticks);
    if total_delta <= 0 {
        return None;
    }
    let idle_delta = i128::from(curr.idle_ticks) - i128::from(prev.idle_ticks);

    let usage = 100.0 - 100.0 * idle_delta as f64 / total_delta as f64;
    Some(round1(usage.clamp(0.0, 100.0)))
}

/// Percentage of `total` that is not `free`, rounded to one decimal.
///
/// A zero total yields `0.0`.
pub fn used_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let usage = 100.0 * (1.0 - free as f64 / total as f64);
    round1(usage.clamp(0.0, 100.0))
}

/// Memory usage from total and free bytes.
pub fn memory_percent(total_bytes: u64, free_bytes: u64) -> f64 {
    used_percent(total_bytes, free_bytes)
}

/// Filesystem usage from total and free capacity (blocks or bytes).
pub fn disk_percent(total: u64, free: u64) -> f64 {
    used_percent(total, free)
}

/// Network throughput between two samples taken `elapsed` apart, in Mbps.
///
/// Returns `None` for a zero-length interval or when either counter went
/// backwards (interface reset or removal).
pub fn network_rate_mbps(
    prev: RawNetworkSample,
    curr: RawNetworkSample,
    elapsed: Duration,
) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    let rx = curr.received_bytes.checked_sub(prev.received_bytes)?;
    let tx = curr.transmitted_bytes.checked_sub(prev.transmitted_bytes)?;

    let bits = rx.saturating_add(tx) as f64 * 8.0;
    Some(round1(bits / secs / 1_000_000.0))
}
