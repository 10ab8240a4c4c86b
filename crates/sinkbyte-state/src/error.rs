//! Guard error types.

/// Errors produced by [`IdempotencyGuard`](crate::IdempotencyGuard) operations.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Internal mutex was poisoned by a panicked thread.
    #[error("idempotency guard lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, GuardError>;
