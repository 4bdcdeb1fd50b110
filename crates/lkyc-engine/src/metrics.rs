//! Attempt-level verification metrics.
//!
//! Lightweight in-process counters using atomics. No exporter; the
//! snapshot accessor is the ops/test surface.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared submission counters.
///
/// Cloning shares the counters; the pipeline holds one clone, the
/// embedding application may hold another.
#[derive(Debug, Clone)]
pub struct VerifyMetrics {
    pub attempt_count: Arc<AtomicU64>,
    pub verified_count: Arc<AtomicU64>,
    pub rejected_count: Arc<AtomicU64>,
    pub upload_failure_count: Arc<AtomicU64>,
}

impl VerifyMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            attempt_count: Arc::new(AtomicU64::new(0)),
            verified_count: Arc::new(AtomicU64::new(0)),
            rejected_count: Arc::new(AtomicU64::new(0)),
            upload_failure_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submissions started, whatever their outcome.
    pub fn attempts(&self) -> u64 {
        self.attempt_count.load(Ordering::Relaxed)
    }

    /// Submissions resolved as verified.
    pub fn verified(&self) -> u64 {
        self.verified_count.load(Ordering::Relaxed)
    }

    /// Submissions resolved as rejected.
    pub fn rejected(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }

    /// Submissions aborted by an artifact store failure.
    pub fn upload_failures(&self) -> u64 {
        self.upload_failure_count.load(Ordering::Relaxed)
    }

    /// A point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            verified: self.verified(),
            rejected: self.rejected(),
            upload_failures: self.upload_failures(),
        }
    }
}

impl Default for VerifyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub verified: u64,
    pub rejected: u64,
    pub upload_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let snapshot = VerifyMetrics::new().snapshot();
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.verified, 0);
        assert_eq!(snapshot.rejected, 0);
        assert_eq!(snapshot.upload_failures, 0);
    }

    #[test]
    fn increments_are_visible_through_clones() {
        let metrics = VerifyMetrics::new();
        let clone = metrics.clone();
        clone.attempt_count.fetch_add(1, Ordering::Relaxed);
        clone.upload_failure_count.fetch_add(1, Ordering::Relaxed);
        assert_eq!(metrics.attempts(), 1);
        assert_eq!(metrics.upload_failures(), 1);
        assert_eq!(metrics.verified(), 0);
    }
}
