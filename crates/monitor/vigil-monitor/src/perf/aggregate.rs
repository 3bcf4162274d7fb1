//! Rolling time-window aggregation of metric values.
//!
//! Values fold into one bucket per canonical (metric name, tag set) key while
//! the bucket is younger than the aggregation window; after that the bucket is
//! replaced, not merged. This is a last-window model, not a historical rollup.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build the canonical aggregation key for a metric name and tag set.
///
/// Tag pairs are sorted lexicographically by name then value and joined onto
/// the metric name, so `{a=1, b=2}` and `{b=2, a=1}` address the same bucket.
pub fn aggregation_key(key: &str, tags: Option<&HashMap<String, String>>) -> String {
    let Some(tags) = tags.filter(|t| !t.is_empty()) else {
        return key.to_string();
    };

    let mut pairs: Vec<(&str, &str)> = tags
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    pairs.sort_unstable();

    let joined = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!("{key}?{joined}")
}

/// A rolling aggregation bucket for one canonical metric key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    /// Canonical key: metric name plus sorted tag pairs
    pub key: String,
    /// Number of values folded into this bucket
    pub count: u64,
    /// Sum of folded values
    pub sum: f64,
    /// Smallest folded value
    pub min: f64,
    /// Largest folded value
    pub max: f64,
    /// Mean of folded values, always recomputed as sum/count
    pub avg: f64,
    /// When this bucket's window started
    pub window_started_at: DateTime<Utc>,
    /// Tags associated with this bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl AggregatedMetric {
    /// Open a fresh bucket seeded with its first value
    pub(crate) fn open(
        key: String,
        value: f64,
        now: DateTime<Utc>,
        tags: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            key,
            count: 1,
            sum: value,
            min: value,
            max: value,
            avg: value,
            window_started_at: now,
            tags,
        }
    }

    /// Fold one value into this bucket
    pub(crate) fn fold(&mut self, value: f64) {
        debug_assert!(self.count > 0, "aggregation bucket with zero count");
        if self.count == 0 {
            // Corrupted bucket: self-heal by reseeding rather than producing
            // a non-finite average.
            self.count = 1;
            self.sum = value;
            self.min = value;
            self.max = value;
            self.avg = value;
            return;
        }

        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.avg = self.sum / self.count as f64;
    }

    /// Whether this bucket's window has ended
    pub fn expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.window_started_at > window
    }
}
