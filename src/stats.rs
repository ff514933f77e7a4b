//! Per-component service statistics and the aggregate status surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Read-only snapshot of one component's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub fail: u64,
    pub dropped: u64,
    pub average_latency_ms: f64,
}

#[derive(Debug, Default, Clone)]
struct StatsInner {
    total: u64,
    success: u64,
    fail: u64,
    dropped: u64,
    average_latency_ms: f64,
}

/// Monotonic counters plus a running average latency, owned by one component.
///
/// Counters only move forward; `reset()` is the sole way back to zero.
/// Never persisted across restarts.
#[derive(Debug, Default)]
pub struct ServiceStats {
    inner: Mutex<StatsInner>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful operation and folds its latency into the
    /// running average.
    pub fn record_success(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        if let Ok(mut inner) = self.inner.lock() {
            inner.total += 1;
            inner.success += 1;
            if inner.average_latency_ms == 0.0 {
                inner.average_latency_ms = latency_ms;
            } else {
                inner.average_latency_ms = (inner.average_latency_ms + latency_ms) / 2.0;
            }
        }
    }

    /// Records a failed operation.
    pub fn record_failure(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.total += 1;
            inner.fail += 1;
        }
    }

    /// Records an item discarded under backpressure (non-fatal).
    pub fn record_dropped(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.dropped += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = match self.inner.lock() {
            Ok(inner) => inner.clone(),
            Err(_) => StatsInner::default(),
        };
        StatsSnapshot {
            total: inner.total,
            success: inner.success,
            fail: inner.fail,
            dropped: inner.dropped,
            average_latency_ms: inner.average_latency_ms,
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = StatsInner::default();
        }
    }
}

/// Aggregates named component stats for the read-only status surface.
#[derive(Default)]
pub struct StatsRegistry {
    components: Mutex<BTreeMap<String, Arc<ServiceStats>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component's stats under a name. A later registration with
    /// the same name replaces the earlier one.
    pub fn register(&self, name: &str, stats: Arc<ServiceStats>) {
        if let Ok(mut components) = self.components.lock() {
            components.insert(name.to_string(), stats);
        }
    }

    /// Snapshot of every registered component, keyed by name.
    pub fn snapshot_all(&self) -> BTreeMap<String, StatsSnapshot> {
        match self.components.lock() {
            Ok(components) => components
                .iter()
                .map(|(name, stats)| (name.clone(), stats.snapshot()))
                .collect(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Resets every registered component.
    pub fn reset_all(&self) {
        if let Ok(components) = self.components.lock() {
            for stats in components.values() {
                stats.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stats_are_zero() {
        let stats = ServiceStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.success, 0);
        assert_eq!(snap.fail, 0);
        assert_eq!(snap.dropped, 0);
        assert_eq!(snap.average_latency_ms, 0.0);
    }

    #[test]
    fn record_success_bumps_counters_and_latency() {
        let stats = ServiceStats::new();
        stats.record_success(Duration::from_millis(100));

        let snap = stats.snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.success, 1);
        assert!((snap.average_latency_ms - 100.0).abs() < 1.0);
    }

    #[test]
    fn average_latency_smooths_over_calls() {
        let stats = ServiceStats::new();
        stats.record_success(Duration::from_millis(100));
        stats.record_success(Duration::from_millis(300));

        // (100 + 300) / 2 = 200
        let snap = stats.snapshot();
        assert!((snap.average_latency_ms - 200.0).abs() < 1.0);
    }

    #[test]
    fn record_failure_does_not_touch_latency() {
        let stats = ServiceStats::new();
        stats.record_failure();
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.fail, 2);
        assert_eq!(snap.success, 0);
        assert_eq!(snap.average_latency_ms, 0.0);
    }

    #[test]
    fn dropped_frames_do_not_count_as_operations() {
        let stats = ServiceStats::new();
        stats.record_dropped();
        stats.record_dropped();

        let snap = stats.snapshot();
        assert_eq!(snap.dropped, 2);
        assert_eq!(snap.total, 0);
    }

    #[test]
    fn reset_returns_to_zero() {
        let stats = ServiceStats::new();
        stats.record_success(Duration::from_millis(50));
        stats.record_failure();
        stats.record_dropped();
        stats.reset();

        assert_eq!(stats.snapshot(), ServiceStats::new().snapshot());
    }

    #[test]
    fn registry_snapshots_all_components() {
        let registry = StatsRegistry::new();
        let recognition = Arc::new(ServiceStats::new());
        let translation = Arc::new(ServiceStats::new());

        registry.register("recognition", recognition.clone());
        registry.register("translation", translation.clone());

        recognition.record_success(Duration::from_millis(10));
        translation.record_failure();

        let all = registry.snapshot_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all["recognition"].success, 1);
        assert_eq!(all["translation"].fail, 1);
    }

    #[test]
    fn registry_reset_all_clears_every_component() {
        let registry = StatsRegistry::new();
        let stats = Arc::new(ServiceStats::new());
        registry.register("synthesis", stats.clone());

        stats.record_success(Duration::from_millis(10));
        registry.reset_all();

        assert_eq!(stats.snapshot().total, 0);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let stats = ServiceStats::new();
        stats.record_success(Duration::from_millis(25));

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"success\":1"));
    }

    #[test]
    fn stats_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServiceStats>();
        assert_send_sync::<StatsRegistry>();
    }
}
