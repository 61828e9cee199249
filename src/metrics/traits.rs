//! Traits for host metrics sources.

use crate::error::Result;
use crate::metrics::data::{Capabilities, RawCpuSample, RawNetworkSample};

/// A platform-specific reader of raw OS counters.
///
/// One implementation is selected at startup (see
/// [`platform_source`](crate::metrics::collector::platform_source)) and the
/// sampler never re-checks the platform afterwards. Readers convert every
/// I/O or parse failure into an `Err`; they never panic.
pub trait MetricsSource: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// What this source can measure. Queried once when the sampler is built.
    fn capabilities(&self) -> Capabilities;

    /// Sum idle and total tick counts across all logical processors.
    ///
    /// Never fails: a platform error yields zero counts, which the sampler
    /// treats as "no delta".
    fn read_cpu_ticks(&mut self) -> RawCpuSample;

    /// Instantaneous memory usage percentage, rounded to one decimal.
    fn read_memory_percent(&mut self) -> f64;

    /// Root filesystem usage percentage, rounded to one decimal.
    ///
    /// Platforms without support return `Ok(0.0)` so the published record
    /// keeps a stable shape.
    fn read_disk_percent(&mut self) -> Result<f64>;

    /// Summed non-loopback interface byte counters.
    ///
    /// Only called when [`Capabilities::network`] is set.
    fn read_network_bytes(&mut self) -> Result<RawNetworkSample>;
}

impl<S: MetricsSource + ?Sized> MetricsSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn read_cpu_ticks(&mut self) -> RawCpuSample {
        (**self).read_cpu_ticks()
    }

    fn read_memory_percent(&mut self) -> f64 {
        (**self).read_memory_percent()
    }

    fn read_disk_percent(&mut self) -> Result<f64> {
        (**self).read_disk_percent()
    }

    fn read_network_bytes(&mut self) -> Result<RawNetworkSample> {
        (**self).read_network_bytes()
    }
}
