//! # Vigil Monitor
//!
//! In-process observability for a desktop agent application: error
//! deduplication and tracking plus performance-metric aggregation, held as
//! bounded, in-memory, process-lifetime state and safe to call from many
//! concurrent call sites.
//!
//! ## Key Features
//! - Fingerprint-based error deduplication with occurrence counts
//! - Explicit error resolution with retention- and cap-based eviction
//! - Leak-proof operation timers with auto-expiry
//! - Rolling time-window metric aggregation per (name, tag set)
//! - Serializable summary views for dashboards and health checks
//!
//! Tracking operations never fail: unknown ids are silent no-ops, disabled
//! monitoring returns zero-like defaults, and external reporting failures are
//! isolated from callers.

pub mod facade;
pub mod fingerprint;
pub mod perf;
pub mod runtime;
pub mod tracker;
pub mod views;

// Re-export main types
pub use facade::{init_tracing, Monitoring, MonitoringConfig, TimerHandle};
pub use perf::{
    AggregatedMetric, MetricConfig, PerformanceMetric, PerformanceMonitor, DEFAULT_METRICS_LIMIT,
};
pub use runtime::{ProcessRuntimeStats, RuntimeStats, RuntimeStatsProvider};
pub use tracker::{
    ErrorContext, ErrorDetail, ErrorLevel, ErrorQuery, ErrorReport, ErrorTracker,
    ErrorTrackingConfig, ReportSink,
};
pub use views::{
    CurrentMetrics, ErrorStats, HealthStatus, PerformanceSummary, SlowestOperation, SystemHealth,
};

use thiserror::Error;

/// Monitor-specific error types
#[derive(Error, Debug)]
pub enum MonitorError {
    /// External report delivery failed
    #[error("Reporting error: {0}")]
    Reporting(String),

    /// Lifecycle misuse, e.g. double initialization
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Error from the core crate, e.g. invalid configuration
    #[error("Core error: {0}")]
    Core(#[from] vigil_core::VigilError),

    /// Any other error
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
