//! Performance monitoring: operation timers, raw sample history, and rolling
//! aggregation.
//!
//! Timers are tracked in a direct id-to-record index so completion is an
//! atomic lookup-and-remove; every started timer is bounded by an auto-expiry
//! that finalizes it as a timeout if the caller never ends it. Raw samples
//! keep a bounded per-key history, and recorded values fold into rolling
//! time-window buckets.

mod timers;

pub mod aggregate;

pub use aggregate::{aggregation_key, AggregatedMetric};

use crate::runtime::RuntimeStatsProvider;
use crate::views::{CurrentMetrics, PerformanceSummary, SlowestOperation};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use timers::PendingTimer;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vigil_core::{Validatable, VigilError, VigilResult};

/// Default number of raw samples returned by [`PerformanceMonitor::get_metrics`].
pub const DEFAULT_METRICS_LIMIT: usize = 100;

/// Operation name recorded for plain value samples.
const RECORD_OPERATION: &str = "record";

/// Configuration for the performance monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Whether monitoring is active; disabled monitoring no-ops every call
    pub enabled: bool,
    /// Cleanup sweep cadence, in milliseconds
    pub interval_ms: u64,
    /// Maximum age of raw samples and pending timers, in milliseconds
    pub max_age_ms: u64,
    /// Aggregation window, in milliseconds
    pub aggregation_window_ms: u64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 60_000,          // 1 minute
            max_age_ms: 300_000,          // 5 minutes
            aggregation_window_ms: 10_000, // 10 seconds
        }
    }
}

impl MetricConfig {
    /// Cleanup sweep cadence
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }

    /// Maximum sample and timer age
    pub fn max_age(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_age_ms)
    }

    /// Aggregation window as a chrono duration
    pub fn aggregation_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.aggregation_window_ms as i64)
    }

    fn max_age_chrono(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.max_age_ms as i64)
    }
}

impl Validatable for MetricConfig {
    fn validate(&self) -> VigilResult<()> {
        if self.interval_ms == 0 {
            return Err(VigilError::config("interval_ms must be positive"));
        }
        if self.max_age_ms == 0 {
            return Err(VigilError::config("max_age_ms must be positive"));
        }
        if self.aggregation_window_ms == 0 {
            return Err(VigilError::config("aggregation_window_ms must be positive"));
        }
        Ok(())
    }
}

/// One raw performance sample.
///
/// Lifecycle: Created(running) while held by the timer index, then
/// Ended(success | failure | timeout); terminal, never re-opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    /// Metric key this sample belongs to
    pub key: String,
    /// Operation name
    pub operation: String,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Wall-clock end time; present once finalized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Duration in milliseconds; defined iff the sample ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Whether the operation succeeded
    pub success: bool,
    /// Tags carried by this sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    /// Free-form metadata: recorded value, timer id, end reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Performance monitoring system for tracking key operations.
///
/// One explicitly owned instance per application context; clones share the
/// same underlying state. Call [`start`](Self::start) to run the periodic
/// cleanup sweep and [`shutdown`](Self::shutdown) to stop it.
pub struct PerformanceMonitor {
    config: MetricConfig,
    enabled: Arc<AtomicBool>,
    metrics: Arc<DashMap<String, Vec<PerformanceMetric>>>,
    aggregations: Arc<DashMap<String, AggregatedMetric>>,
    pending: Arc<DashMap<Uuid, PendingTimer>>,
    janitor: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PerformanceMonitor {
    /// Create a new monitor with the given configuration
    pub fn new(config: MetricConfig) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            enabled: Arc::new(AtomicBool::new(enabled)),
            metrics: Arc::new(DashMap::new()),
            aggregations: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            janitor: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether monitoring is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable performance monitoring
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Start timing an operation.
    ///
    /// Returns the timer id, or [`Uuid::nil`] when monitoring is disabled.
    /// An auto-expiry task finalizes the timer as a timeout after the
    /// configured max age, so a forgotten timer can never leak.
    pub fn start_timer(
        &self,
        key: &str,
        operation: &str,
        tags: Option<HashMap<String, String>>,
    ) -> Uuid {
        if !self.is_enabled() {
            return Uuid::nil();
        }

        let id = Uuid::new_v4();
        self.pending.insert(
            id,
            PendingTimer::new(key.to_string(), operation.to_string(), tags),
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let monitor = self.clone();
                let max_age = self.config.max_age();
                let expiry = handle.spawn(async move {
                    tokio::time::sleep(max_age).await;
                    let elapsed = monitor.finalize_timer(id, false, Some("timeout"));
                    if elapsed > 0.0 {
                        tracing::debug!(timer_id = %id, elapsed_ms = elapsed, "timer expired");
                    }
                });
                // The timer may already have been finalized by a racing
                // end_timer; in that case the detached task no-ops.
                if let Some(mut entry) = self.pending.get_mut(&id) {
                    entry.expiry = Some(expiry);
                }
            }
            Err(_) => {
                tracing::debug!(timer_id = %id, "no async runtime; timer has no auto-expiry");
            }
        }

        id
    }

    /// End timing an operation and record the finalized sample.
    ///
    /// Idempotent: an unknown or already-finalized timer id returns 0 and
    /// changes nothing. Exactly one of a manual end and the auto-expiry wins.
    pub fn end_timer(&self, timer_id: Uuid, success: bool, reason: Option<&str>) -> f64 {
        if !self.is_enabled() {
            return 0.0;
        }

        self.finalize_timer(timer_id, success, reason)
    }

    /// Record a plain metric value.
    ///
    /// The value folds into the current aggregation bucket for the canonical
    /// (key, tags) pair and is appended to raw history as a zero-duration
    /// completed sample.
    pub fn record_metric(&self, key: &str, value: f64, tags: Option<HashMap<String, String>>) {
        if !self.is_enabled() {
            return;
        }

        let now = Utc::now();
        self.update_aggregation(key, value, now, tags.as_ref());

        let mut metadata = HashMap::new();
        metadata.insert("value".to_string(), serde_json::json!(value));

        self.push_sample(PerformanceMetric {
            key: key.to_string(),
            operation: RECORD_OPERATION.to_string(),
            started_at: now,
            ended_at: Some(now),
            duration_ms: Some(0.0),
            success: true,
            tags,
            metadata: Some(metadata),
        });
    }

    /// Get aggregated metrics, optionally filtered by key prefix, sorted by
    /// canonical key
    pub fn get_aggregated_metrics(&self, prefix: Option<&str>) -> Vec<AggregatedMetric> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let mut buckets: Vec<AggregatedMetric> = self
            .aggregations
            .iter()
            .filter(|entry| prefix.map_or(true, |p| entry.key().starts_with(p)))
            .map(|entry| entry.value().clone())
            .collect();
        buckets.sort_by(|a, b| a.key.cmp(&b.key));
        buckets
    }

    /// Get raw samples, newest first, optionally restricted to one key
    pub fn get_metrics(&self, key: Option<&str>, limit: Option<usize>) -> Vec<PerformanceMetric> {
        if !self.is_enabled() {
            return Vec::new();
        }

        let mut samples: Vec<PerformanceMetric> = match key {
            Some(key) => self
                .metrics
                .get(key)
                .map(|entry| entry.value().clone())
                .unwrap_or_default(),
            None => self
                .metrics
                .iter()
                .flat_map(|entry| entry.value().clone())
                .collect(),
        };

        samples.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        samples.truncate(limit.unwrap_or(DEFAULT_METRICS_LIMIT));
        samples
    }

    /// Get a summary over all completed samples
    pub fn get_performance_summary(&self) -> PerformanceSummary {
        if !self.is_enabled() {
            return PerformanceSummary::default();
        }

        let samples: Vec<PerformanceMetric> = self
            .metrics
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|m| m.ended_at.is_some())
            .collect();

        summarize(&samples)
    }

    /// Get the summary plus host-supplied environment figures.
    ///
    /// Heap, platform, and uptime figures come from the provider; the core
    /// computes none of them.
    pub fn get_current_metrics(&self, runtime: &dyn RuntimeStatsProvider) -> CurrentMetrics {
        let summary = self.get_performance_summary();
        let stats = runtime.stats();
        let total = summary.total_metrics;

        CurrentMetrics {
            total_operations: total,
            success_rate: summary.success_rate,
            average_duration_ms: summary.average_duration_ms,
            slowest_operation: summary.slowest_operation.clone(),
            error_count: summary.error_count,
            error_rate: summary.error_count as f64 / total.max(1) as f64,
            response_time_ms: summary.average_duration_ms,
            api_calls: total,
            heap_used: stats.heap_used,
            heap_total: stats.heap_total,
            platform: stats.platform,
            arch: stats.arch,
            uptime_secs: stats.uptime.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    /// Remove raw samples and aggregation buckets past the max age.
    ///
    /// Runs on the janitor interval; uses the same per-entry locking as
    /// foreground operations.
    pub fn cleanup(&self) {
        if !self.is_enabled() {
            return;
        }

        let now = Utc::now();
        let cutoff = now - self.config.max_age_chrono();

        self.metrics.retain(|_, samples| {
            samples.retain(|sample| sample.ended_at.map_or(true, |ended| ended > cutoff));
            !samples.is_empty()
        });

        let max_age = self.config.max_age_chrono();
        self.aggregations
            .retain(|_, bucket| !bucket.expired(now, max_age));
    }

    /// Clear all performance data, aborting any pending timers
    pub fn clear_data(&self) {
        self.metrics.clear();
        self.aggregations.clear();
        self.pending.retain(|_, timer| {
            if let Some(handle) = timer.expiry.take() {
                handle.abort();
            }
            false
        });
    }

    /// Number of pending (running) timers
    pub fn pending_timers(&self) -> usize {
        self.pending.len()
    }

    /// Start the periodic cleanup sweep. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut guard = self.janitor.lock();
        if guard.is_some() {
            return false;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("cleanup sweep not started: no async runtime");
            return false;
        };

        let monitor = self.clone();
        let period = self.config.interval();
        *guard = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                monitor.cleanup();
            }
        }));
        true
    }

    /// Stop the periodic cleanup sweep
    pub fn shutdown(&self) {
        if let Some(handle) = self.janitor.lock().take() {
            handle.abort();
        }
    }

    /// Finalize a pending timer exactly once.
    ///
    /// The atomic remove on the index decides the winner between a manual
    /// end and the auto-expiry; the loser sees `None` and returns 0.
    fn finalize_timer(&self, timer_id: Uuid, success: bool, reason: Option<&str>) -> f64 {
        let Some((_, pending)) = self.pending.remove(&timer_id) else {
            return 0.0;
        };

        if let Some(handle) = pending.expiry.as_ref() {
            handle.abort();
        }

        let duration_ms = pending.elapsed_ms();
        let mut metadata = HashMap::new();
        metadata.insert(
            "timer_id".to_string(),
            serde_json::json!(timer_id.to_string()),
        );
        if let Some(reason) = reason {
            metadata.insert("reason".to_string(), serde_json::json!(reason));
        }

        self.push_sample(PerformanceMetric {
            key: pending.key.clone(),
            operation: pending.operation.clone(),
            started_at: pending.started_at,
            ended_at: Some(Utc::now()),
            duration_ms: Some(duration_ms),
            success,
            tags: pending.tags.clone(),
            metadata: Some(metadata),
        });

        duration_ms
    }

    /// Fold a value into the current bucket for the canonical key, opening a
    /// fresh bucket when the window has rolled over
    fn update_aggregation(
        &self,
        key: &str,
        value: f64,
        now: DateTime<Utc>,
        tags: Option<&HashMap<String, String>>,
    ) {
        let agg_key = aggregation_key(key, tags);
        let window = self.config.aggregation_window();

        self.aggregations
            .entry(agg_key.clone())
            .and_modify(|bucket| {
                if bucket.expired(now, window) {
                    *bucket = AggregatedMetric::open(agg_key.clone(), value, now, tags.cloned());
                } else {
                    bucket.fold(value);
                }
            })
            .or_insert_with(|| AggregatedMetric::open(agg_key.clone(), value, now, tags.cloned()));
    }

    fn push_sample(&self, sample: PerformanceMetric) {
        self.metrics
            .entry(sample.key.clone())
            .or_default()
            .push(sample);
    }
}

impl Clone for PerformanceMonitor {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            enabled: self.enabled.clone(),
            metrics: self.metrics.clone(),
            aggregations: self.aggregations.clone(),
            pending: self.pending.clone(),
            janitor: self.janitor.clone(),
        }
    }
}

/// Compute a summary over a set of completed samples
fn summarize(samples: &[PerformanceMetric]) -> PerformanceSummary {
    let total = samples.len();
    let successful = samples.iter().filter(|m| m.success).count();

    let durations: Vec<f64> = samples.iter().filter_map(|m| m.duration_ms).collect();
    let average_duration_ms = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    let slowest_operation = samples
        .iter()
        .filter_map(|m| m.duration_ms.map(|d| (m, d)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(m, d)| SlowestOperation {
            operation: m.operation.clone(),
            duration_ms: d,
        });

    PerformanceSummary {
        total_metrics: total,
        success_rate: if total > 0 {
            successful as f64 / total as f64
        } else {
            1.0
        },
        average_duration_ms,
        slowest_operation,
        error_count: total - successful,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_ms, 60_000);
        assert_eq!(config.max_age_ms, 300_000);
        assert_eq!(config.aggregation_window_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        for broken in [
            MetricConfig {
                interval_ms: 0,
                ..MetricConfig::default()
            },
            MetricConfig {
                max_age_ms: 0,
                ..MetricConfig::default()
            },
            MetricConfig {
                aggregation_window_ms: 0,
                ..MetricConfig::default()
            },
        ] {
            assert!(broken.validate().is_err());
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_metrics, 0);
        assert_eq!(summary.success_rate, 1.0);
        assert_eq!(summary.average_duration_ms, 0.0);
        assert!(summary.slowest_operation.is_none());
        assert_eq!(summary.error_count, 0);
    }

    #[test]
    fn test_summarize_finds_slowest() {
        let now = Utc::now();
        let sample = |operation: &str, duration_ms: f64, success: bool| PerformanceMetric {
            key: "k".into(),
            operation: operation.into(),
            started_at: now,
            ended_at: Some(now),
            duration_ms: Some(duration_ms),
            success,
            tags: None,
            metadata: None,
        };

        let summary = summarize(&[
            sample("fast", 1.0, true),
            sample("slow", 9.0, true),
            sample("failed", 4.0, false),
        ]);

        assert_eq!(summary.total_metrics, 3);
        assert_eq!(summary.error_count, 1);
        let slowest = summary.slowest_operation.unwrap();
        assert_eq!(slowest.operation, "slow");
        assert_eq!(slowest.duration_ms, 9.0);
    }
}
