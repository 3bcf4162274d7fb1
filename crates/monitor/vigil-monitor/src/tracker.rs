//! Error deduplication and tracking.
//!
//! This module owns one record per unique error fingerprint, counts repeat
//! occurrences, supports explicit resolution, and evicts stale records by
//! retention age and by a hard cap. All tracking operations are infallible:
//! unknown ids are silent no-ops and reporting-sink failures are isolated
//! from the caller.

use crate::fingerprint;
use crate::views::ErrorStats;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vigil_core::utils::string;
use vigil_core::{Identifiable, Validatable, VigilError, VigilResult};

/// Severity level of a tracked error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// A failure that prevented an operation from completing
    Error,
    /// A recoverable or degraded-mode condition
    Warning,
    /// An informational notice worth tracking
    Info,
}

/// Caller-supplied situational context for an error occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// UI component or subsystem the error surfaced in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Operation that was in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Kind of agent involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    /// User agent string of the host shell
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Conversation the error occurred in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Free-form additional data; never participates in fingerprinting
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Stand-in for a host exception: its message and, when available, its stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// The exception message
    pub message: String,
    /// The exception stack trace, most recent frame first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorDetail {
    /// Create a detail carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Attach a stack trace
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// One deduplicated error report.
///
/// Exactly one report exists per fingerprint while tracked; `count` is
/// monotonically non-decreasing until the report is evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Stable identifier, assigned once at first occurrence
    pub id: Uuid,
    /// Time of the most recent occurrence
    pub timestamp: DateTime<Utc>,
    /// Level of the most recent occurrence
    pub level: ErrorLevel,
    /// Message of the first occurrence, plus any resolution note
    pub message: String,
    /// Deduplication fingerprint
    pub fingerprint: String,
    /// Context of the most recent occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Stack of the most recent occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Number of occurrences observed so far
    pub count: u64,
    /// Whether this report has been explicitly resolved
    pub resolved: bool,
    /// When the report was resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Identifiable for ErrorReport {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.message
    }

    fn type_name(&self) -> &'static str {
        "error_report"
    }
}

/// Filter criteria for [`ErrorTracker::get_errors`].
#[derive(Debug, Clone, Default)]
pub struct ErrorQuery {
    /// Only reports at this level
    pub level: Option<ErrorLevel>,
    /// Only reports with this resolution state
    pub resolved: Option<bool>,
    /// Only reports whose context component or operation matches
    pub context: Option<String>,
    /// Only reports from this component
    pub component: Option<String>,
    /// Maximum number of reports to return
    pub limit: Option<usize>,
}

/// External reporting integration for auto-reported errors.
///
/// Dispatch is fire-and-forget: the tracker never blocks on a sink and a
/// failing sink never affects the tracking call's outcome.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one error report to the external service
    async fn report(&self, report: &ErrorReport) -> Result<()>;
}

/// Configuration for the error tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorTrackingConfig {
    /// Whether tracking is active; disabled tracking no-ops every call
    pub enabled: bool,
    /// Hard cap on distinct tracked reports
    pub max_errors: usize,
    /// Retention horizon for resolved reports, in days
    pub retention_days: i64,
    /// Auto-dispatch error-level reports to the configured sink
    pub auto_report: bool,
    /// Aggregation window in milliseconds; the cleanup sweep runs every
    /// ten windows
    pub aggregation_window_ms: u64,
}

impl Default for ErrorTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_errors: 1000,
            retention_days: 30,
            auto_report: false,
            aggregation_window_ms: 60_000, // 1 minute
        }
    }
}

impl Validatable for ErrorTrackingConfig {
    fn validate(&self) -> VigilResult<()> {
        if self.max_errors == 0 {
            return Err(VigilError::config("max_errors must be positive"));
        }
        if self.retention_days < 0 {
            return Err(VigilError::config("retention_days must not be negative"));
        }
        if self.aggregation_window_ms == 0 {
            return Err(VigilError::config("aggregation_window_ms must be positive"));
        }
        Ok(())
    }
}

/// Error tracking and reporting system.
///
/// One explicitly owned instance per application context; clones share the
/// same underlying state. Call [`start`](Self::start) to run the periodic
/// cleanup sweep and [`shutdown`](Self::shutdown) to stop it.
pub struct ErrorTracker {
    config: ErrorTrackingConfig,
    enabled: Arc<AtomicBool>,
    errors: Arc<DashMap<String, ErrorReport>>,
    sink: Option<Arc<dyn ReportSink>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ErrorTracker {
    /// Create a new tracker with the given configuration
    pub fn new(config: ErrorTrackingConfig) -> Self {
        let enabled = config.enabled;
        Self {
            config,
            enabled: Arc::new(AtomicBool::new(enabled)),
            errors: Arc::new(DashMap::new()),
            sink: None,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Attach an external reporting sink for auto-reported errors
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Whether tracking is currently enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable error tracking
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Track an error occurrence.
    ///
    /// Returns the report's stable id, or [`Uuid::nil`] when tracking is
    /// disabled. The first occurrence creates the report; repeats overwrite
    /// level, timestamp, context, and stack with the latest occurrence and
    /// increment the count. Never fails and never blocks.
    pub fn track_error(
        &self,
        level: ErrorLevel,
        message: &str,
        detail: Option<&ErrorDetail>,
        context: Option<ErrorContext>,
    ) -> Uuid {
        if !self.is_enabled() {
            return Uuid::nil();
        }

        let stack = detail.and_then(|d| d.stack.as_deref());
        let key = fingerprint::generate(message, stack, context.as_ref());
        let now = Utc::now();

        // Single critical section per fingerprint: the entry lock covers both
        // the insert-if-absent and the in-place update, so concurrent
        // identical errors cannot lose count increments.
        let mut entry = self
            .errors
            .entry(key.clone())
            .or_insert_with(|| ErrorReport {
                id: Uuid::new_v4(),
                timestamp: now,
                level,
                message: message.to_string(),
                fingerprint: key.clone(),
                context: None,
                stack: None,
                count: 0,
                resolved: false,
                resolved_at: None,
            });

        let report = entry.value_mut();
        report.level = level;
        report.timestamp = now;
        report.count += 1;
        report.context = context;
        report.stack = stack.map(str::to_owned);

        let id = report.id;
        let outbound = (self.config.auto_report && level == ErrorLevel::Error)
            .then(|| report.clone());
        drop(entry);

        if let Some(report) = outbound {
            self.dispatch_report(report);
        }

        id
    }

    /// Mark an error as resolved.
    ///
    /// Unknown ids are silent no-ops. A resolution note, when given, is
    /// appended to the report's message.
    pub fn resolve_error(&self, id: Uuid, resolution: Option<&str>) {
        if !self.is_enabled() {
            return;
        }

        let key = self
            .errors
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.fingerprint.clone());

        if let Some(key) = key {
            if let Some(mut report) = self.errors.get_mut(&key) {
                report.resolved = true;
                report.resolved_at = Some(Utc::now());

                if let Some(note) = resolution.filter(|r| !string::is_blank(r)) {
                    report.message.push_str("\n\nResolution: ");
                    report.message.push_str(note);
                }
            }
        }
    }

    /// Get error details by report id
    pub fn get_error_by_id(&self, id: Uuid) -> Option<ErrorReport> {
        self.errors
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone())
    }

    /// Get error statistics
    pub fn get_error_stats(&self) -> ErrorStats {
        let all_errors: Vec<ErrorReport> =
            self.errors.iter().map(|e| e.value().clone()).collect();

        let resolved_errors = all_errors.iter().filter(|e| e.resolved).count();

        let mut recent_errors: Vec<ErrorReport> = all_errors
            .iter()
            .filter(|e| !e.resolved)
            .cloned()
            .collect();
        recent_errors.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_errors.truncate(10);

        let mut top_errors = all_errors.clone();
        top_errors.sort_by(|a, b| b.count.cmp(&a.count));
        top_errors.truncate(20);

        // Trend: unresolved reports seen in the last 24 hours against the
        // unresolved backlog older than that.
        let one_day_ago = Utc::now() - Duration::hours(24);
        let recent_24h = all_errors
            .iter()
            .filter(|e| !e.resolved && e.timestamp > one_day_ago)
            .count();
        let older_24h = all_errors
            .iter()
            .filter(|e| !e.resolved && e.timestamp <= one_day_ago)
            .count();
        let error_rate_trend = if older_24h > 0 {
            recent_24h as f64 / older_24h as f64
        } else {
            0.0
        };

        let critical = all_errors
            .iter()
            .filter(|e| e.level == ErrorLevel::Error)
            .count();
        let warning = all_errors
            .iter()
            .filter(|e| e.level == ErrorLevel::Warning)
            .count();
        let info = all_errors
            .iter()
            .filter(|e| e.level == ErrorLevel::Info)
            .count();

        ErrorStats {
            total_errors: all_errors.len(),
            error_rate_trend,
            top_errors,
            recent_errors,
            resolved_errors,
            critical,
            warning,
            info,
        }
    }

    /// Get error reports matching the given criteria, sorted by occurrence
    /// count descending
    pub fn get_errors(&self, criteria: &ErrorQuery) -> Vec<ErrorReport> {
        let mut errors: Vec<ErrorReport> = self
            .errors
            .iter()
            .map(|e| e.value().clone())
            .filter(|e| {
                if let Some(level) = criteria.level {
                    if e.level != level {
                        return false;
                    }
                }
                if let Some(resolved) = criteria.resolved {
                    if e.resolved != resolved {
                        return false;
                    }
                }
                if let Some(needle) = &criteria.context {
                    let matches = e.context.as_ref().is_some_and(|c| {
                        c.operation.as_deref() == Some(needle.as_str())
                            || c.component.as_deref() == Some(needle.as_str())
                    });
                    if !matches {
                        return false;
                    }
                }
                if let Some(component) = &criteria.component {
                    if e.context.as_ref().and_then(|c| c.component.as_deref())
                        != Some(component.as_str())
                    {
                        return false;
                    }
                }
                true
            })
            .collect();

        errors.sort_by(|a, b| b.count.cmp(&a.count));

        if let Some(limit) = criteria.limit {
            errors.truncate(limit);
        }

        errors
    }

    /// Remove stale reports.
    ///
    /// Resolved reports past the retention horizon go first; if the store
    /// still exceeds the cap, the oldest-by-timestamp reports are removed
    /// regardless of resolution state. Eligibility is re-checked inside the
    /// critical section performing each removal, so a concurrent update to a
    /// report spares it.
    pub fn cleanup_old_errors(&self) {
        if !self.is_enabled() {
            return;
        }

        let cutoff = Utc::now() - Duration::days(self.config.retention_days);
        self.errors
            .retain(|_, report| !(report.resolved && report.timestamp < cutoff));

        let excess = self.errors.len().saturating_sub(self.config.max_errors);
        if excess > 0 {
            let mut stamped: Vec<(String, DateTime<Utc>)> = self
                .errors
                .iter()
                .map(|e| (e.key().clone(), e.timestamp))
                .collect();
            stamped.sort_by_key(|(_, seen_at)| *seen_at);

            for (key, seen_at) in stamped.into_iter().take(excess) {
                self.errors
                    .remove_if(&key, |_, report| report.timestamp <= seen_at);
            }
        }
    }

    /// Clear all error data
    pub fn clear_errors(&self) {
        self.errors.clear();
    }

    /// Number of distinct tracked reports
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no reports are currently tracked
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Start the periodic cleanup sweep.
    ///
    /// Runs every ten aggregation windows. Returns false if the sweep is
    /// already running.
    pub fn start(&self) -> bool {
        let mut guard = self.sweeper.lock();
        if guard.is_some() {
            return false;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("cleanup sweep not started: no async runtime");
            return false;
        };

        let tracker = self.clone();
        let period =
            std::time::Duration::from_millis(self.config.aggregation_window_ms.saturating_mul(10));
        *guard = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracker.cleanup_old_errors();
            }
        }));
        true
    }

    /// Stop the periodic cleanup sweep
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }

    /// Send an error report to the external sink without blocking the caller
    fn dispatch_report(&self, report: ErrorReport) {
        let Some(sink) = self.sink.clone() else {
            tracing::error!(
                id = %report.id,
                level = ?report.level,
                fingerprint = %report.fingerprint,
                count = report.count,
                message = %report.message,
                "error report"
            );
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.report(&report).await {
                        tracing::warn!(error = %err, id = %report.id, "error report sink failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(id = %report.id, "auto-report skipped: no async runtime");
            }
        }
    }
}

impl Clone for ErrorTracker {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            enabled: self.enabled.clone(),
            errors: self.errors.clone(),
            sink: self.sink.clone(),
            sweeper: self.sweeper.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ErrorTrackingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_errors, 1000);
        assert_eq!(config.retention_days, 30);
        assert!(!config.auto_report);
        assert_eq!(config.aggregation_window_ms, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ErrorTrackingConfig {
            max_errors: 0,
            ..ErrorTrackingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ErrorTrackingConfig {
            retention_days: -1,
            ..ErrorTrackingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ErrorTrackingConfig {
            aggregation_window_ms: 0,
            ..ErrorTrackingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_track_assigns_id_once() {
        let tracker = ErrorTracker::new(ErrorTrackingConfig::default());
        let first = tracker.track_error(ErrorLevel::Error, "boom", None, None);
        let second = tracker.track_error(ErrorLevel::Error, "boom", None, None);
        assert_eq!(first, second);
        assert_ne!(first, Uuid::nil());
    }

    #[test]
    fn test_disabled_tracking_returns_nil() {
        let tracker = ErrorTracker::new(ErrorTrackingConfig {
            enabled: false,
            ..ErrorTrackingConfig::default()
        });
        let id = tracker.track_error(ErrorLevel::Error, "boom", None, None);
        assert_eq!(id, Uuid::nil());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_latest_occurrence_wins() {
        let tracker = ErrorTracker::new(ErrorTrackingConfig::default());
        tracker.track_error(ErrorLevel::Warning, "boom", None, None);
        let id = tracker.track_error(ErrorLevel::Error, "boom", None, None);

        let report = tracker.get_error_by_id(id).unwrap();
        assert_eq!(report.level, ErrorLevel::Error);
        assert_eq!(report.count, 2);
    }
}
