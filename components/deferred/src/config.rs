//! Event loop configuration.

use serde::{Deserialize, Serialize};

/// Which clock an event loop measures timer deadlines against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Wall-clock time; the loop sleeps until the next deadline.
    #[default]
    Real,
    /// Time only moves when the loop is told to advance or jumps to the
    /// next deadline. Deterministic; used by tests.
    Virtual,
}

/// Configuration for an [`EventLoop`](crate::EventLoop).
///
/// # Examples
///
/// ```
/// use deferred::{ClockMode, LoopConfig};
///
/// let config = LoopConfig::new()
///     .with_clock(ClockMode::Virtual)
///     .with_max_turns(1_000);
/// assert_eq!(config.max_turns, Some(1_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Clock used for timer deadlines
    pub clock: ClockMode,
    /// Upper bound on tasks plus microtasks executed by a single run call
    pub max_turns: Option<usize>,
}

impl LoopConfig {
    /// Creates the default configuration: real clock, no turn limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the clock
    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    /// Limit the number of turns a single run call may execute
    pub fn with_max_turns(mut self, limit: usize) -> Self {
        self.max_turns = Some(limit);
        self
    }
}
