//! Read-only view models returned to consumers.
//!
//! Everything here is a detached copy of internal state and serializes
//! losslessly into a plain key/value document for dashboards, health-check
//! endpoints, or CLIs.

use crate::tracker::ErrorReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error tracking statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorStats {
    /// Distinct tracked reports
    pub total_errors: usize,
    /// Unresolved reports from the last 24 hours over unresolved reports
    /// older than that; 0 when the older bucket is empty
    pub error_rate_trend: f64,
    /// The 20 highest-count reports
    pub top_errors: Vec<ErrorReport>,
    /// The 10 most recently seen unresolved reports
    pub recent_errors: Vec<ErrorReport>,
    /// Reports marked resolved
    pub resolved_errors: usize,
    /// Reports at the error level
    pub critical: usize,
    /// Reports at the warning level
    pub warning: usize,
    /// Reports at the info level
    pub info: usize,
}

/// The slowest completed operation on record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowestOperation {
    /// Operation name
    pub operation: String,
    /// Its duration in milliseconds
    pub duration_ms: f64,
}

/// Summary over all completed performance samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Number of completed samples
    pub total_metrics: usize,
    /// Successful over total completed samples; 1.0 when none exist
    pub success_rate: f64,
    /// Mean duration of completed samples, in milliseconds
    pub average_duration_ms: f64,
    /// Slowest completed operation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowest_operation: Option<SlowestOperation>,
    /// Completed samples that did not succeed
    pub error_count: usize,
}

impl Default for PerformanceSummary {
    fn default() -> Self {
        Self {
            total_metrics: 0,
            success_rate: 1.0,
            average_duration_ms: 0.0,
            slowest_operation: None,
            error_count: 0,
        }
    }
}

/// The performance summary plus host-supplied environment figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentMetrics {
    /// Number of completed samples
    pub total_operations: usize,
    /// Successful over total completed samples
    pub success_rate: f64,
    /// Mean duration of completed samples, in milliseconds
    pub average_duration_ms: f64,
    /// Slowest completed operation, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowest_operation: Option<SlowestOperation>,
    /// Completed samples that did not succeed
    pub error_count: usize,
    /// Failed over total completed samples
    pub error_rate: f64,
    /// Alias of the mean duration, for response-time dashboards
    pub response_time_ms: f64,
    /// Alias of the completed sample count, for call-volume dashboards
    pub api_calls: usize,
    /// Heap bytes in use, as reported by the host
    pub heap_used: u64,
    /// Heap bytes reserved, as reported by the host
    pub heap_total: u64,
    /// Host platform identifier
    pub platform: String,
    /// Host architecture identifier
    pub arch: String,
    /// Host uptime in seconds
    pub uptime_secs: f64,
    /// When this snapshot was taken
    pub timestamp: DateTime<Utc>,
}

/// Overall system status derived from the health document's figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Operations are succeeding and no unresolved error-level reports
    Healthy,
    /// Elevated failures or unresolved error-level reports present
    Degraded,
    /// The majority of recent operations are failing
    Critical,
}

impl HealthStatus {
    /// Derive a status from the success rate and the unresolved
    /// error-level report count
    pub fn derive(success_rate: f64, unresolved_critical: usize) -> Self {
        if success_rate < 0.5 {
            Self::Critical
        } else if success_rate < 0.9 || unresolved_critical > 0 {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Performance block of the combined health document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthPerformance {
    /// Number of completed samples
    pub total_operations: usize,
    /// Successful over total, rounded to two decimals
    pub success_rate: f64,
    /// Mean duration in milliseconds, rounded to two decimals
    pub average_duration_ms: f64,
    /// Slowest operation rendered as `"name (x ms)"`, or `"N/A"`
    pub slowest_operation: String,
    /// Completed samples that did not succeed
    pub error_count: usize,
}

/// Condensed error report entry used in the health document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthErrorEntry {
    /// Report id
    pub id: uuid::Uuid,
    /// Report message
    pub message: String,
    /// Occurrences so far
    pub count: u64,
    /// Level of the most recent occurrence
    pub level: crate::tracker::ErrorLevel,
    /// Time of the most recent occurrence
    pub timestamp: DateTime<Utc>,
    /// Whether the report was resolved
    pub resolved: bool,
}

impl From<&ErrorReport> for HealthErrorEntry {
    fn from(report: &ErrorReport) -> Self {
        Self {
            id: report.id,
            message: report.message.clone(),
            count: report.count,
            level: report.level,
            timestamp: report.timestamp,
            resolved: report.resolved,
        }
    }
}

/// Errors block of the combined health document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthErrors {
    /// Distinct tracked reports
    pub total_errors: usize,
    /// Error rate trend, rounded to two decimals
    pub error_rate_trend: f64,
    /// Condensed highest-count reports
    pub top_errors: Vec<HealthErrorEntry>,
    /// Condensed most recent unresolved reports
    pub recent_errors: Vec<HealthErrorEntry>,
    /// Reports marked resolved
    pub resolved_count: usize,
}

/// Combined system health document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    /// When the document was assembled
    pub timestamp: DateTime<Utc>,
    /// Derived overall status
    pub status: HealthStatus,
    /// Performance block
    pub performance: HealthPerformance,
    /// Errors block
    pub errors: HealthErrors,
}

/// Round a figure to two decimal places for presentation
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.996), 1.0);
        assert_eq!(round2(12.3449), 12.34);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_health_status_derivation() {
        assert_eq!(HealthStatus::derive(1.0, 0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::derive(0.95, 3), HealthStatus::Degraded);
        assert_eq!(HealthStatus::derive(0.8, 0), HealthStatus::Degraded);
        assert_eq!(HealthStatus::derive(0.4, 0), HealthStatus::Critical);
    }

    #[test]
    fn test_summary_serializes_to_plain_document() {
        let summary = PerformanceSummary {
            total_metrics: 2,
            success_rate: 0.5,
            average_duration_ms: 10.0,
            slowest_operation: Some(SlowestOperation {
                operation: "select".into(),
                duration_ms: 15.0,
            }),
            error_count: 1,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["total_metrics"], 2);
        assert_eq!(value["slowest_operation"]["operation"], "select");

        let back: PerformanceSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back.total_metrics, 2);
        assert_eq!(back.slowest_operation, summary.slowest_operation);
    }
}
