//! Utility functions and helpers for the Vigil stack.
//!
//! This module provides common utility functions shared across Vigil
//! components.

/// String utilities
pub mod string {
    /// Check if a string is empty or contains only whitespace
    #[must_use]
    pub fn is_blank(s: &str) -> bool {
        s.trim().is_empty()
    }

    /// Get the first line of a string, without the trailing newline
    #[must_use]
    pub fn first_line(s: &str) -> &str {
        s.lines().next().unwrap_or("")
    }

    /// Truncate a string to at most `max_chars` characters, respecting
    /// character boundaries
    #[must_use]
    pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
        match s.char_indices().nth(max_chars) {
            Some((idx, _)) => &s[..idx],
            None => s,
        }
    }
}

/// Time utilities
pub mod time {
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Get current timestamp as milliseconds since Unix epoch
    #[must_use]
    pub fn current_timestamp_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Check if a timestamp is expired given a TTL
    #[must_use]
    pub fn is_expired(timestamp_millis: u64, ttl_millis: u64) -> bool {
        let now = current_timestamp_millis();
        now > timestamp_millis + ttl_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(string::is_blank(""));
        assert!(string::is_blank("   \t\n"));
        assert!(!string::is_blank("  x  "));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(string::first_line("one\ntwo\nthree"), "one");
        assert_eq!(string::first_line("single"), "single");
        assert_eq!(string::first_line(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(string::truncate_chars("abcdef", 3), "abc");
        assert_eq!(string::truncate_chars("ab", 3), "ab");
        // multi-byte characters must not be split
        assert_eq!(string::truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_is_expired() {
        let now = time::current_timestamp_millis();
        assert!(time::is_expired(now.saturating_sub(10_000), 5_000));
        assert!(!time::is_expired(now, 60_000));
    }
}
