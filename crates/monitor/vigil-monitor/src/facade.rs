//! Application-facing monitoring facade.
//!
//! One [`Monitoring`] instance owns the error tracker and the performance
//! monitor for an application context. Construct it explicitly, call
//! [`init`](Monitoring::init) once at startup and
//! [`shutdown`](Monitoring::shutdown) at teardown, and inject references into
//! callers; there is no implicit global instance.

use crate::perf::{MetricConfig, PerformanceMonitor};
use crate::runtime::{ProcessRuntimeStats, RuntimeStatsProvider};
use crate::tracker::{ErrorLevel, ErrorQuery, ErrorTracker, ErrorTrackingConfig, ReportSink};
use crate::views::{
    round2, CurrentMetrics, HealthErrors, HealthPerformance, HealthStatus, SystemHealth,
};
use crate::{MonitorError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use vigil_core::config::FileConfigSource;
use vigil_core::{Validatable, VigilResult};

/// Combined configuration for the monitoring subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Error tracking configuration
    pub errors: ErrorTrackingConfig,
    /// Performance monitoring configuration
    pub metrics: MetricConfig,
}

impl MonitoringConfig {
    /// Load and validate a configuration file (TOML or JSON, auto-detected)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = FileConfigSource::auto_detect(path)?.load()?;
        Ok(config)
    }
}

impl Validatable for MonitoringConfig {
    fn validate(&self) -> VigilResult<()> {
        self.errors.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

/// The monitoring subsystem for one application context.
pub struct Monitoring {
    tracker: ErrorTracker,
    monitor: PerformanceMonitor,
    runtime: Arc<dyn RuntimeStatsProvider>,
    initialized: AtomicBool,
}

impl Monitoring {
    /// Create the subsystem from a validated configuration
    pub fn new(config: MonitoringConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tracker: ErrorTracker::new(config.errors),
            monitor: PerformanceMonitor::new(config.metrics),
            runtime: Arc::new(ProcessRuntimeStats::new()),
            initialized: AtomicBool::new(false),
        })
    }

    /// Attach an external reporting sink for auto-reported errors
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.tracker = self.tracker.with_sink(sink);
        self
    }

    /// Replace the host runtime figures provider
    #[must_use]
    pub fn with_runtime_stats(mut self, provider: Arc<dyn RuntimeStatsProvider>) -> Self {
        self.runtime = provider;
        self
    }

    /// Initialize monitoring: enable both stores and start their periodic
    /// cleanup sweeps.
    ///
    /// Fails if the subsystem is already initialized.
    pub fn init(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::Lifecycle(
                "monitoring already initialized".to_string(),
            ));
        }

        self.tracker.set_enabled(true);
        self.monitor.set_enabled(true);
        self.tracker.start();
        self.monitor.start();

        tracing::info!("monitoring initialized");
        Ok(())
    }

    /// Stop the periodic sweeps. The subsystem may be initialized again
    /// afterwards.
    pub fn shutdown(&self) {
        self.tracker.shutdown();
        self.monitor.shutdown();
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!("monitoring stopped");
    }

    /// Enable or disable both stores at once
    pub fn set_enabled(&self, enabled: bool) {
        self.tracker.set_enabled(enabled);
        self.monitor.set_enabled(enabled);
    }

    /// The error tracker
    pub fn errors(&self) -> &ErrorTracker {
        &self.tracker
    }

    /// The performance monitor
    pub fn performance(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Assemble the combined system health document
    pub fn system_health(&self) -> SystemHealth {
        let summary = self.monitor.get_performance_summary();
        let stats = self.tracker.get_error_stats();

        let unresolved_critical = self
            .tracker
            .get_errors(&ErrorQuery {
                level: Some(ErrorLevel::Error),
                resolved: Some(false),
                ..ErrorQuery::default()
            })
            .len();

        let slowest_operation = summary
            .slowest_operation
            .as_ref()
            .map(|s| format!("{} ({:.2} ms)", s.operation, s.duration_ms))
            .unwrap_or_else(|| "N/A".to_string());

        SystemHealth {
            timestamp: Utc::now(),
            status: HealthStatus::derive(summary.success_rate, unresolved_critical),
            performance: HealthPerformance {
                total_operations: summary.total_metrics,
                success_rate: round2(summary.success_rate),
                average_duration_ms: round2(summary.average_duration_ms),
                slowest_operation,
                error_count: summary.error_count,
            },
            errors: HealthErrors {
                total_errors: stats.total_errors,
                error_rate_trend: round2(stats.error_rate_trend),
                top_errors: stats.top_errors.iter().map(Into::into).collect(),
                recent_errors: stats.recent_errors.iter().map(Into::into).collect(),
                resolved_count: stats.resolved_errors,
            },
        }
    }

    /// The performance summary plus host-supplied environment figures
    pub fn current_metrics(&self) -> CurrentMetrics {
        self.monitor.get_current_metrics(self.runtime.as_ref())
    }

    /// Start a timer for an operation and get a handle to end it.
    ///
    /// When no key is given the operation name is used as the metric key.
    /// An unfinished handle is bounded by the monitor's auto-expiry.
    pub fn timer(
        &self,
        operation: &str,
        key: Option<&str>,
        tags: Option<HashMap<String, String>>,
    ) -> TimerHandle<'_> {
        let id = self
            .monitor
            .start_timer(key.unwrap_or(operation), operation, tags);
        TimerHandle {
            id,
            monitor: &self.monitor,
        }
    }

    /// Run a future under a timer.
    ///
    /// A failed future ends the timer unsuccessfully with the error's display
    /// text as the reason, then propagates the error unchanged.
    pub async fn with_tracking<F, T, E>(&self, name: &str, operation: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let timer = self.timer(name, Some("function"), None);

        match operation.await {
            Ok(value) => {
                timer.end(true, None);
                Ok(value)
            }
            Err(err) => {
                let reason = err.to_string();
                timer.end(false, Some(&reason));
                Err(err)
            }
        }
    }
}

/// Handle for an in-flight operation timer.
pub struct TimerHandle<'a> {
    id: Uuid,
    monitor: &'a PerformanceMonitor,
}

impl TimerHandle<'_> {
    /// The underlying timer id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// End the timer, returning the measured duration in milliseconds
    pub fn end(self, success: bool, reason: Option<&str>) -> f64 {
        self.monitor.end_timer(self.id, success, reason)
    }
}

/// Install a global tracing subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
