//! In-flight operation timers.
//!
//! Every started timer lives in a direct id-to-record index until it is
//! finalized, either by an explicit `end_timer` call or by its auto-expiry
//! task. The index's atomic remove guarantees exactly one finalization.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;
use tokio::task::JoinHandle;

/// A started, not yet finalized operation timer.
#[derive(Debug)]
pub(crate) struct PendingTimer {
    /// Metric key the finalized sample will be recorded under
    pub key: String,
    /// Operation name
    pub operation: String,
    /// Wall-clock start, carried into the finalized sample
    pub started_at: DateTime<Utc>,
    /// Monotonic start, used for duration measurement
    pub started: Instant,
    /// Tags carried into the finalized sample
    pub tags: Option<HashMap<String, String>>,
    /// Auto-expiry task; aborted on explicit finalization
    pub expiry: Option<JoinHandle<()>>,
}

impl PendingTimer {
    pub(crate) fn new(
        key: String,
        operation: String,
        tags: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            key,
            operation,
            started_at: Utc::now(),
            started: Instant::now(),
            tags,
            expiry: None,
        }
    }

    /// Milliseconds elapsed since the timer started
    pub(crate) fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}
