//! Host runtime figures.
//!
//! The monitoring core never measures its environment itself; heap, platform,
//! and uptime figures are supplied by the host through this seam so the core
//! stays free of platform-specific probes.

use std::time::{Duration, Instant};

/// Read-only environment figures supplied by the host.
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    /// Heap bytes currently in use, 0 when the host cannot observe it
    pub heap_used: u64,
    /// Heap bytes reserved, 0 when the host cannot observe it
    pub heap_total: u64,
    /// Platform identifier, e.g. `linux`
    pub platform: String,
    /// Architecture identifier, e.g. `x86_64`
    pub arch: String,
    /// How long the host has been running
    pub uptime: Duration,
}

/// Provider of host runtime figures.
pub trait RuntimeStatsProvider: Send + Sync {
    /// Get a current snapshot of the host's runtime figures
    fn stats(&self) -> RuntimeStats;
}

/// Default provider reporting what the standard library can observe.
///
/// Uptime is measured from this provider's construction; heap figures are
/// reported as 0 because the standard library offers no portable view of
/// allocator state.
#[derive(Debug)]
pub struct ProcessRuntimeStats {
    started: Instant,
}

impl ProcessRuntimeStats {
    /// Create a provider whose uptime starts now
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for ProcessRuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStatsProvider for ProcessRuntimeStats {
    fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            heap_used: 0,
            heap_total: 0,
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            uptime: self.started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_runtime_stats() {
        let provider = ProcessRuntimeStats::new();
        let stats = provider.stats();

        assert!(!stats.platform.is_empty());
        assert!(!stats.arch.is_empty());
        assert_eq!(stats.heap_used, 0);
        assert_eq!(stats.heap_total, 0);
    }

    #[test]
    fn test_uptime_advances() {
        let provider = ProcessRuntimeStats::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(provider.stats().uptime >= Duration::from_millis(5));
    }
}
