//! # Host Pulse - host health sampler
//!
//! A background sampler that measures CPU, memory, disk and network
//! utilization on the host every two seconds and publishes the result two
//! ways: a pull endpoint (`GET /health`) and a push channel (`health-update`
//! events on the `health` WebSocket topic).
//!
//! ## Features
//!
//! - **Delta-based CPU usage** from successive tick counter readings
//! - **Platform sources** selected once at startup (procfs on Linux, sysinfo
//!   elsewhere)
//! - **Partial-failure isolation**: a failed reading keeps the previous value
//! - **Single writer**: only the sampler can change the published record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use host_pulse::{platform_source, start_web_server, MetricsStore, Sampler, WebConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (store, writer) = MetricsStore::new();
//!     let sampler = Arc::new(Sampler::new(platform_source(), writer));
//!     let shutdown = CancellationToken::new();
//!
//!     let capabilities = sampler.capabilities();
//!     sampler.spawn(shutdown.clone());
//!     start_web_server(WebConfig::default(), store, capabilities, shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod web;

// Re-export public API
pub use error::{HealthError, Result};
pub use metrics::{
    platform_source, Capabilities, HealthMetrics, HealthReport, MetricsSource, MetricsStore,
    MetricsWriter, RawCpuSample, RawNetworkSample, Sampler, SamplerTiming, TickOutcome,
};

pub use web::{start_web_server, WebConfig};

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
