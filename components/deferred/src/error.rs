//! Error types for the event loop.
//!
//! Futures themselves never fail in this sense: their rejection channel
//! carries a caller-chosen error type. These errors describe misuse or
//! exhaustion of the loop that drives them.

use thiserror::Error;

/// Errors raised while driving an [`EventLoop`](crate::EventLoop).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    /// Time can only be advanced by hand on a virtual clock.
    #[error("advancing time requires a virtual clock")]
    VirtualClockRequired,

    /// The loop ran more turns than its configuration allows.
    #[error("event loop exceeded its limit of {limit} turns")]
    TurnLimitExceeded {
        /// The configured limit
        limit: usize,
    },
}

/// Result type for event loop operations
pub type LoopResult<T> = Result<T, LoopError>;
