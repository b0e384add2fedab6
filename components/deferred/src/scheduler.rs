//! The scheduling capability futures depend on.
//!
//! A future never runs a continuation on the caller's stack. It hands the
//! continuation to a [`Scheduler`], which must run it later, in FIFO order
//! relative to other deferred callbacks. Delay combinators use the timer
//! half of the trait.

use crate::task_queue::{MicroTask, Task};
use std::sync::Arc;
use std::time::Duration;

/// Deferred-callback and timer capability injected into every future.
pub trait Scheduler: Send + Sync {
    /// Run `task` after the current call stack unwinds, after every
    /// previously scheduled microtask.
    fn schedule(&self, task: MicroTask);

    /// Run `task` once `delay` has elapsed on the scheduler's clock.
    fn schedule_after(&self, delay: Duration, task: Task);
}

/// Shared handle to a scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;
