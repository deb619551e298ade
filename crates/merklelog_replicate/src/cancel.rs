//! Cooperative cancellation.

use crate::error::{ReplicateError, ReplicateResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared cancellation flag.
///
/// Clones observe the same flag. Cancelling stops work at the next fetch or
/// write; completed writes are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with [`ReplicateError::Cancelled`] once cancelled.
    pub(crate) fn check(&self) -> ReplicateResult<()> {
        if self.is_cancelled() {
            Err(ReplicateError::Cancelled)
        } else {
            Ok(())
        }
    }
}
