//! Settle-once futures with chaining and combinators.
//!
//! This crate provides a deferred-value primitive and the runtime pieces that
//! drive it:
//! - [`Future`] - pending until settled once, fulfilled or rejected
//! - [`Future::then`] / [`Future::catch`] - chaining, with nested futures
//!   flattened through [`Outcome::Chained`]
//! - [`Future::all`], [`Future::race`], [`Future::resolve_delay`] and
//!   [`Future::reject_delay`] - combinators over collections and timers
//! - [`EventLoop`] - the default [`Scheduler`], with a microtask queue for
//!   deferred callbacks and a timer queue on a real or virtual clock
//!
//! # Overview
//!
//! Continuations never run on the stack that attached them. Settlement hands
//! waiting callbacks to the future's scheduler, and `then` on an already
//! settled future schedules its continuation, so code after a `then` call
//! always runs before the continuation body.
//!
//! # Examples
//!
//! ```
//! use deferred::{EventLoop, Future, Outcome};
//! use std::time::Duration;
//!
//! let mut event_loop = EventLoop::virtual_time();
//! let scheduler = event_loop.scheduler();
//!
//! let s = scheduler.clone();
//! let chained = Future::<i32, String>::resolve(&scheduler, Outcome::Plain(4))
//!     .and_then(move |v| {
//!         Ok(Outcome::Chained(Future::resolve_delay(
//!             &s,
//!             Outcome::Plain(v * 2),
//!             Duration::from_millis(10),
//!         )))
//!     });
//!
//! event_loop.run_until_done().unwrap();
//! assert_eq!(chained.value(), Some(8));
//! assert_eq!(event_loop.now(), Duration::from_millis(10));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod combinators;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod future;
pub mod scheduler;
pub mod task_queue;

// Re-export main types at crate root
pub use config::{ClockMode, LoopConfig};
pub use error::{LoopError, LoopResult};
pub use event_loop::{EventLoop, LoopHandle, RunStats};
pub use future::{Future, FutureId, FutureState, Outcome, Reject, Resolve};
pub use scheduler::{Scheduler, SchedulerRef};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TimerQueue};
