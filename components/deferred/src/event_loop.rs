//! Event loop implementation.
//!
//! This module provides the default [`Scheduler`]: an event loop with a
//! microtask queue for deferred settlement callbacks and a timer queue for
//! the delay combinators. Each turn of the loop:
//! 1. Drains all microtasks, including ones queued while draining
//! 2. Takes the earliest due timer task and executes it
//! 3. Repeats
//!
//! The loop measures deadlines against either the real clock or a virtual
//! clock that only moves when told to. Tests use the virtual clock.

use crate::config::{ClockMode, LoopConfig};
use crate::error::{LoopError, LoopResult};
use crate::scheduler::{Scheduler, SchedulerRef};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TimerQueue};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Counts of what a single run call executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunStats {
    /// Timer tasks executed
    pub tasks: usize,
    /// Microtasks executed
    pub microtasks: usize,
}

#[derive(Debug)]
struct Queues {
    microtasks: MicrotaskQueue,
    timers: TimerQueue,
    virtual_now: Duration,
}

#[derive(Debug)]
struct Shared {
    clock: ClockMode,
    origin: Instant,
    queues: Mutex<Queues>,
}

impl Shared {
    fn now(&self, queues: &Queues) -> Duration {
        match self.clock {
            ClockMode::Real => self.origin.elapsed(),
            ClockMode::Virtual => queues.virtual_now,
        }
    }
}

/// A cloneable, thread-safe handle that schedules work onto an [`EventLoop`].
#[derive(Debug, Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl Scheduler for LoopHandle {
    fn schedule(&self, task: MicroTask) {
        self.shared.queues.lock().microtasks.enqueue(task);
    }

    fn schedule_after(&self, delay: Duration, task: Task) {
        let mut queues = self.shared.queues.lock();
        let deadline = self.shared.now(&queues) + delay;
        trace!(deadline = ?deadline, "timer scheduled");
        queues.timers.insert(deadline, task);
    }
}

struct Turns {
    limit: Option<usize>,
    used: usize,
}

impl Turns {
    fn new(limit: Option<usize>) -> Self {
        Self { limit, used: 0 }
    }

    fn tick(&mut self) -> LoopResult<()> {
        self.used += 1;
        match self.limit {
            Some(limit) if self.used > limit => {
                warn!(limit, "event loop turn limit exceeded");
                Err(LoopError::TurnLimitExceeded { limit })
            }
            _ => Ok(()),
        }
    }
}

/// The event loop driving futures.
///
/// # Examples
///
/// ```
/// use deferred::{EventLoop, Future, Outcome};
/// use std::time::Duration;
///
/// let mut event_loop = EventLoop::virtual_time();
/// let scheduler = event_loop.scheduler();
///
/// let delayed: Future<i32, String> =
///     Future::resolve_delay(&scheduler, Outcome::Plain(5), Duration::from_millis(20));
///
/// event_loop.advance(Duration::from_millis(19)).unwrap();
/// assert!(delayed.is_pending());
///
/// event_loop.advance(Duration::from_millis(1)).unwrap();
/// assert_eq!(delayed.value(), Some(5));
/// ```
#[derive(Debug)]
pub struct EventLoop {
    shared: Arc<Shared>,
    config: LoopConfig,
}

impl EventLoop {
    /// Creates a new EventLoop on the real clock with empty queues.
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Creates a new EventLoop on a virtual clock starting at zero.
    pub fn virtual_time() -> Self {
        Self::with_config(LoopConfig::new().with_clock(ClockMode::Virtual))
    }

    /// Creates a new EventLoop from an explicit configuration.
    pub fn with_config(config: LoopConfig) -> Self {
        let shared = Shared {
            clock: config.clock,
            origin: Instant::now(),
            queues: Mutex::new(Queues {
                microtasks: MicrotaskQueue::new(),
                timers: TimerQueue::new(),
                virtual_now: Duration::ZERO,
            }),
        };
        Self {
            shared: Arc::new(shared),
            config,
        }
    }

    /// The configuration this loop was built with.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Returns a handle that schedules onto this loop.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns this loop as a type-erased scheduler for constructing futures.
    pub fn scheduler(&self) -> SchedulerRef {
        Arc::new(self.handle())
    }

    /// Time elapsed on this loop's clock since it was created.
    pub fn now(&self) -> Duration {
        let queues = self.shared.queues.lock();
        self.shared.now(&queues)
    }

    /// Returns true if neither microtasks nor timers are pending.
    pub fn is_idle(&self) -> bool {
        let queues = self.shared.queues.lock();
        queues.microtasks.is_empty() && queues.timers.is_empty()
    }

    /// Number of timers not yet fired.
    pub fn pending_timers(&self) -> usize {
        self.shared.queues.lock().timers.len()
    }

    /// Number of microtasks waiting to run.
    pub fn pending_microtasks(&self) -> usize {
        self.shared.queues.lock().microtasks.len()
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// Microtasks added during execution are also processed before this
    /// method returns. Timers are left alone.
    pub fn run_microtasks(&mut self) -> usize {
        let mut ran = 0;
        while let Some(microtask) = self.pop_microtask() {
            microtask.run();
            ran += 1;
        }
        ran
    }

    /// Drains microtasks and fires timers that are already due, without
    /// moving the clock.
    pub fn run_until_stalled(&mut self) -> LoopResult<RunStats> {
        let mut stats = RunStats::default();
        let mut turns = Turns::new(self.config.max_turns);

        loop {
            self.drain_microtasks(&mut stats, &mut turns)?;
            if !self.fire_due_timer(self.now(), &mut stats, &mut turns)? {
                break;
            }
        }

        Ok(stats)
    }

    /// Moves a virtual clock forward by `by`, firing every timer whose
    /// deadline falls inside the window in deadline order and draining
    /// microtasks after each.
    ///
    /// # Errors
    ///
    /// [`LoopError::VirtualClockRequired`] on a real clock, or
    /// [`LoopError::TurnLimitExceeded`] when the configured limit trips.
    pub fn advance(&mut self, by: Duration) -> LoopResult<RunStats> {
        if self.shared.clock != ClockMode::Virtual {
            return Err(LoopError::VirtualClockRequired);
        }

        let mut stats = RunStats::default();
        let mut turns = Turns::new(self.config.max_turns);
        let target = self.now() + by;

        loop {
            self.drain_microtasks(&mut stats, &mut turns)?;

            let due = {
                let mut queues = self.shared.queues.lock();
                match queues.timers.next_deadline() {
                    Some(deadline) if deadline <= target => {
                        queues.virtual_now = queues.virtual_now.max(deadline);
                        Some(deadline)
                    }
                    _ => None,
                }
            };
            match due {
                Some(deadline) => {
                    self.fire_due_timer(deadline, &mut stats, &mut turns)?;
                }
                None => break,
            }
        }

        self.shared.queues.lock().virtual_now = target;
        Ok(stats)
    }

    /// Runs the loop until both queues are empty.
    ///
    /// A virtual clock jumps straight to each deadline; a real clock sleeps
    /// until it.
    pub fn run_until_done(&mut self) -> LoopResult<RunStats> {
        let mut stats = RunStats::default();
        let mut turns = Turns::new(self.config.max_turns);
        debug!(clock = ?self.shared.clock, "event loop running until done");

        loop {
            self.drain_microtasks(&mut stats, &mut turns)?;

            let next = {
                let mut queues = self.shared.queues.lock();
                let Some(deadline) = queues.timers.next_deadline() else {
                    break;
                };
                match self.shared.clock {
                    ClockMode::Virtual => {
                        queues.virtual_now = queues.virtual_now.max(deadline);
                        None
                    }
                    ClockMode::Real => deadline.checked_sub(self.shared.origin.elapsed()),
                }
            };
            if let Some(wait) = next {
                std::thread::sleep(wait);
            }

            self.fire_due_timer(self.now(), &mut stats, &mut turns)?;
        }

        debug!(
            tasks = stats.tasks,
            microtasks = stats.microtasks,
            "event loop finished"
        );
        Ok(stats)
    }

    fn pop_microtask(&self) -> Option<MicroTask> {
        self.shared.queues.lock().microtasks.dequeue()
    }

    // The turn is charged before anything leaves a queue, so a tripped
    // limit leaves the work in place for the next run call.
    fn drain_microtasks(&self, stats: &mut RunStats, turns: &mut Turns) -> LoopResult<()> {
        while self.pending_microtasks() > 0 {
            turns.tick()?;
            let Some(microtask) = self.pop_microtask() else {
                break;
            };
            microtask.run();
            stats.microtasks += 1;
        }
        Ok(())
    }

    /// Runs the earliest timer if it is due at `now`. Returns false when
    /// nothing was due.
    fn fire_due_timer(
        &self,
        now: Duration,
        stats: &mut RunStats,
        turns: &mut Turns,
    ) -> LoopResult<bool> {
        if !self.shared.queues.lock().timers.is_due(now) {
            return Ok(false);
        }
        turns.tick()?;
        let due = self.shared.queues.lock().timers.pop_due(now);
        if let Some(task) = due {
            trace!(now = ?now, "timer fired");
            task.run();
            stats.tasks += 1;
        }
        Ok(true)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
