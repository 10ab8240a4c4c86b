//! Ephemeral run state for sinkbyte destinations.
//!
//! Provides the [`IdempotencyGuard`], a short-lived in-memory marker store
//! keyed by [`RunKey`](sinkbyte_types::state::RunKey) that suppresses
//! duplicate concurrent execution of the same logical run. Nothing here
//! survives a process restart.

#![warn(clippy::pedantic)]

pub mod error;
pub mod guard;

pub use error::GuardError;
pub use guard::{Admission, IdempotencyGuard, InFlightRun, RunPermit};

/// Convenience re-exports for guard users.
pub mod prelude {
    pub use crate::error::GuardError;
    pub use crate::guard::{Admission, IdempotencyGuard, InFlightRun, RunPermit};
    pub use sinkbyte_types::state::RunKey;
}
