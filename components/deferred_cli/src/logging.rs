//! Subscriber setup for the demo binary.

use tracing::Level;

/// Install a stderr `fmt` subscriber capped at `level`.
///
/// Later calls are no-ops, so tests may call this freely.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
