//! The process-wide health record and its publish channel.
//!
//! [`MetricsStore`] is a cheap, clonable read handle given to the pull and
//! push sinks. [`MetricsWriter`] is the only way to change the record; it is
//! not `Clone`, and [`MetricsStore::new`] hands out exactly one.

use crate::metrics::data::{HealthMetrics, HealthReport};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Capacity of the push channel. Subscribers that fall further behind skip
/// the missed updates.
pub const PUBLISH_CAPACITY: usize = 16;

/// Read handle to the current health record.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    current: Arc<RwLock<HealthMetrics>>,
    updates: broadcast::Sender<HealthReport>,
}

/// Single writer for the health record.
#[derive(Debug)]
pub struct MetricsWriter {
    current: Arc<RwLock<HealthMetrics>>,
    updates: broadcast::Sender<HealthReport>,
}

impl MetricsStore {
    /// Create a zero-initialized store along with its writer.
    pub fn new() -> (Self, MetricsWriter) {
        let current = Arc::new(RwLock::new(HealthMetrics::default()));
        let (updates, _rx) = broadcast::channel(PUBLISH_CAPACITY);

        let store = Self {
            current: Arc::clone(&current),
            updates: updates.clone(),
        };
        (store, MetricsWriter { current, updates })
    }

    /// Copy of the current record.
    pub async fn snapshot(&self) -> HealthMetrics {
        *self.current.read().await
    }

    /// Current record in wire form.
    pub async fn report(&self) -> HealthReport {
        self.snapshot().await.report()
    }

    /// Receive one report per completed sampler tick.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthReport> {
        self.updates.subscribe()
    }

    /// Number of live push subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl MetricsWriter {
    /// Replace the whole record.
    pub async fn commit(&self, metrics: HealthMetrics) {
        *self.current.write().await = metrics;
    }

    /// Broadcast a completed record to push subscribers.
    ///
    /// Returns the number of subscribers reached. Having none is not an
    /// error.
    pub fn publish(&self, metrics: &HealthMetrics) -> usize {
        match self.updates.send(metrics.report()) {
            Ok(receivers) => {
                debug!("Published health update to {} subscribers", receivers);
                receivers
            }
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_starts_zeroed() {
        let (store, _writer) = MetricsStore::new();
        assert_eq!(store.snapshot().await, HealthMetrics::default());
        assert_eq!(
            store.report().await,
            HealthReport {
                cpu: 0.0,
                memory: 0.0,
                disk: 0.0,
                network: 0.0
            }
        );
    }

    #[tokio::test]
    async fn test_commit_is_visible_to_every_reader() {
        let (store, writer) = MetricsStore::new();
        let other = store.clone();
        let metrics = HealthMetrics {
            cpu_percent: 1.0,
            memory_percent: 2.0,
            disk_percent: 3.0,
            network_mbps: Some(4.0),
        };
        writer.commit(metrics).await;
        assert_eq!(store.snapshot().await, metrics);
        assert_eq!(other.snapshot().await, metrics);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let (store, writer) = MetricsStore::new();
        assert_eq!(store.subscriber_count(), 0);
        assert_eq!(writer.publish(&HealthMetrics::default()), 0);

        let mut rx = store.subscribe();
        assert_eq!(writer.publish(&HealthMetrics::default()), 1);
        assert_eq!(rx.recv().await.unwrap(), HealthReport::default());
    }
}
