//! Fixed-interval sampler that turns raw counters into the health record.
//!
//! One timer drives everything: every fast tick reads CPU and memory (and
//! network where the source supports it), every [`DISK_TICK_MULTIPLE`]th
//! tick also reads disk usage. Ticks never overlap; a tick requested while
//! another is running is skipped rather than queued.

use crate::metrics::data::{self, Capabilities, HealthMetrics, RawCpuSample, RawNetworkSample};
use crate::metrics::store::MetricsWriter;
use crate::metrics::traits::MetricsSource;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Period of the fast tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Disk usage is read on every n-th fast tick, starting with the first.
pub const DISK_TICK_MULTIPLE: u64 = 2;

/// Delay between start and the CPU seed read.
pub const WARMUP_DELAY: Duration = Duration::from_millis(500);

/// CPU and network rates need a baseline at least this fraction of the tick
/// interval old. Younger baselines are kept and the rate is left unchanged.
const MIN_WINDOW_DIVISOR: u32 = 2;

/// Sampler timing. The binary always uses the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerTiming {
    pub warmup: Duration,
    pub interval: Duration,
}

impl SamplerTiming {
    /// Shortest interval a CPU or network rate is computed over.
    pub fn min_window(&self) -> Duration {
        self.interval / MIN_WINDOW_DIVISOR
    }
}

impl Default for SamplerTiming {
    fn default() -> Self {
        Self {
            warmup: WARMUP_DELAY,
            interval: TICK_INTERVAL,
        }
    }
}

/// Result of a tick request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The tick ran; carries the committed record.
    Completed(HealthMetrics),
    /// Another tick was still running.
    Skipped,
    /// The tick panicked. Fields committed before the panic are kept.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum NetworkState {
    /// Permanent capability gap, never read again.
    Unsupported,
    /// Supported, no baseline sample yet.
    Waiting,
    Tracking {
        sample: RawNetworkSample,
        taken_at: Instant,
    },
}

struct SamplerState<S> {
    source: S,
    prev_cpu: Option<(RawCpuSample, Instant)>,
    network: NetworkState,
    tick_index: u64,
    current: HealthMetrics,
}

/// The sampler core. Owns the metrics source, the previous raw samples and
/// the only [`MetricsWriter`].
pub struct Sampler<S = Box<dyn MetricsSource>> {
    state: Mutex<SamplerState<S>>,
    writer: MetricsWriter,
    capabilities: Capabilities,
    source_name: &'static str,
    timing: SamplerTiming,
}

impl<S: MetricsSource> Sampler<S> {
    /// Create a sampler over `source`, writing through `writer`.
    pub fn new(source: S, writer: MetricsWriter) -> Self {
        let capabilities = source.capabilities();
        let source_name = source.name();
        let network = if capabilities.network {
            NetworkState::Waiting
        } else {
            NetworkState::Unsupported
        };

        Self {
            state: Mutex::new(SamplerState {
                source,
                prev_cpu: None,
                network,
                tick_index: 0,
                current: HealthMetrics::default(),
            }),
            writer,
            capabilities,
            source_name,
            timing: SamplerTiming::default(),
        }
    }

    /// Override the warm-up delay and tick period.
    pub fn with_timing(mut self, timing: SamplerTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn timing(&self) -> SamplerTiming {
        self.timing
    }

    /// Unscheduled seed read so the first real tick has a baseline.
    pub async fn seed(&self) {
        let mut state = self.state.lock().await;
        state.prev_cpu = Some((state.source.read_cpu_ticks(), Instant::now()));
        state.sample_network(Duration::ZERO);
        debug!("Seeded sampler baseline from {}", self.source_name);
    }

    /// Run one tick unless another one is in progress.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("Previous tick still running, skipping");
            return TickOutcome::Skipped;
        };

        match AssertUnwindSafe(state.tick(&self.writer, self.timing.min_window()))
            .catch_unwind()
            .await
        {
            Ok(metrics) => TickOutcome::Completed(metrics),
            Err(_) => {
                error!("Metrics tick panicked; keeping previously committed values");
                TickOutcome::Failed
            }
        }
    }

    /// Seed, wait one interval and tick: a single measurement outside the
    /// scheduled loop.
    pub async fn sample_once(&self) -> HealthMetrics {
        self.seed().await;
        time::sleep(self.timing.interval).await;
        loop {
            match self.tick().await {
                TickOutcome::Completed(metrics) => return metrics,
                TickOutcome::Failed => return self.state.lock().await.current,
                TickOutcome::Skipped => time::sleep(Duration::from_millis(10)).await,
            }
        }
    }

    /// Warm up, then tick on the fixed interval until `cancel` fires.
    ///
    /// A tick already in progress when cancellation arrives runs to
    /// completion.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Starting health sampler ({}, every {:?}, disk every {} ticks)",
            self.source_name, self.timing.interval, DISK_TICK_MULTIPLE
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Health sampler cancelled before warm-up");
                return;
            }
            _ = time::sleep(self.timing.warmup) => {}
        }

        self.seed().await;
        self.tick().await;

        let mut interval = time::interval_at(Instant::now() + self.timing.interval, self.timing.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("Health sampler stopped");
    }
}

impl<S: MetricsSource + 'static> Sampler<S> {
    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

impl<S: MetricsSource> SamplerState<S> {
    async fn tick(&mut self, writer: &MetricsWriter, window: Duration) -> HealthMetrics {
        let index = self.tick_index;
        self.tick_index = self.tick_index.wrapping_add(1);

        self.sample_cpu(window);

        self.current.memory_percent = self.source.read_memory_percent();
        writer.commit(self.current).await;

        if index % DISK_TICK_MULTIPLE == 0 {
            match self.source.read_disk_percent() {
                Ok(percent) => self.current.disk_percent = percent,
                Err(err) => warn!("Disk usage read failed, keeping last value: {}", err),
            }
        }
        self.sample_network(window);

        writer.commit(self.current).await;
        writer.publish(&self.current);

        debug!(
            "Tick {}: cpu {:.1}%, memory {:.1}%, disk {:.1}%, network {:?} Mbps",
            index,
            self.current.cpu_percent,
            self.current.memory_percent,
            self.current.disk_percent,
            self.current.network_mbps
        );
        self.current
    }

    fn sample_cpu(&mut self, window: Duration) {
        let now = Instant::now();
        if let Some((_, taken_at)) = self.prev_cpu {
            if now.duration_since(taken_at) < window {
                debug!("CPU baseline younger than {:?}, keeping it", window);
                return;
            }
        }

        let curr = self.source.read_cpu_ticks();
        if let Some(usage) = self
            .prev_cpu
            .and_then(|(prev, _)| data::cpu_usage_between(prev, curr))
        {
            self.current.cpu_percent = usage;
        }
        self.prev_cpu = Some((curr, now));
    }

    fn sample_network(&mut self, window: Duration) {
        let now = Instant::now();
        match self.network {
            NetworkState::Unsupported => return,
            NetworkState::Tracking { taken_at, .. } if now.duration_since(taken_at) < window => {
                debug!("Network baseline younger than {:?}, keeping it", window);
                return;
            }
            _ => {}
        }

        let sample = match self.source.read_network_bytes() {
            Ok(sample) => sample,
            Err(err) if err.is_permanent() => {
                warn!("Network rate unavailable on this host: {}", err);
                self.network = NetworkState::Unsupported;
                self.current.network_mbps = None;
                return;
            }
            Err(err) => {
                warn!("Network counter read failed, keeping last value: {}", err);
                return;
            }
        };

        if let NetworkState::Tracking {
            sample: prev,
            taken_at,
        } = self.network
        {
            if let Some(rate) = data::network_rate_mbps(prev, sample, now.duration_since(taken_at)) {
                self.current.network_mbps = Some(rate);
            }
        }
        self.network = NetworkState::Tracking {
            sample,
            taken_at: now,
        };
    }
}
