//! Batch-wide cancellation context shared by every task of one batch.

use tokio_util::sync::CancellationToken;

/// Shared, monotonic interruption flag for a batch of pooled tasks
///
/// Cloning yields a handle to the same flag. Once [`interrupt`](Self::interrupt)
/// is called, every task holding this context that has not yet started fails
/// with [`Error::Interrupted`](crate::Error::Interrupted) instead of running.
/// Tasks that are already running are not affected.
#[derive(Clone, Debug, Default)]
pub struct TaskContext {
    token: CancellationToken,
}

impl TaskContext {
    /// Create a fresh, non-interrupted context
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the batch as interrupted. Idempotent; the flag is never reset.
    pub fn interrupt(&self) {
        self.token.cancel();
    }

    /// Whether [`interrupt`](Self::interrupt) has been called on any clone
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }
}
