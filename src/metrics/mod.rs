//! Host health sampling.
//!
//! Platform sources read raw OS counters, the sampler derives percentages
//! and rates from successive readings, and the store holds the single
//! published record.

pub mod collector;
pub mod data;
pub mod procfs;
pub mod sampler;
pub mod store;
pub mod traits;

// Re-export commonly used items
pub use collector::{platform_source, LinuxCollector, PortableCollector};
pub use data::{Capabilities, HealthMetrics, HealthReport, RawCpuSample, RawNetworkSample};
pub use sampler::{Sampler, SamplerTiming, TickOutcome};
pub use store::{MetricsStore, MetricsWriter};
pub use traits::MetricsSource;
