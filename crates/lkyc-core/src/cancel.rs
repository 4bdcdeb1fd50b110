//! Cooperative cancellation for verification attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between a verification attempt and whoever
/// may abandon it (atomic for lock-free checking).
///
/// Cloning shares the flag. Each consumer picks its own observation
/// points: the submission pipeline checks before each upload and before
/// the processing marker, and the provider HTTP clients check between
/// retry waves. Past a consumer's last checkpoint the work runs to
/// completion regardless of the flag, so a profile can never be parked
/// at `processing` by a cancel.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Irreversible for this token; a new attempt
    /// gets a new token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
