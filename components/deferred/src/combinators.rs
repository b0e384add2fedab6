//! Constructors and combinators built on top of [`Future::then`]'s
//! machinery: `resolve`, `reject`, `all`, `race` and the delayed variants.
//!
//! Every function takes the scheduler explicitly, since an empty input
//! still has to produce a future bound to some loop.

use crate::future::{Future, Outcome};
use crate::scheduler::SchedulerRef;
use crate::task_queue::Task;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

struct Collected<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// A future that fulfills with a plain value right away, or adopts the
    /// outcome of a chained future.
    pub fn resolve(scheduler: &SchedulerRef, value: Outcome<T, E>) -> Self {
        Self::new(scheduler, |resolve, reject| {
            value.adopt_into(resolve, reject);
            Ok(())
        })
    }

    /// A future already rejected with `error`.
    pub fn reject(scheduler: &SchedulerRef, error: E) -> Self {
        Self::new(scheduler, |_resolve, reject| {
            reject.reject(error);
            Ok(())
        })
    }

    /// Fulfills with every member's value, in input order, once all members
    /// have fulfilled. Rejects with the first rejection observed.
    ///
    /// An empty input fulfills immediately with an empty vector.
    pub fn all(scheduler: &SchedulerRef, futures: Vec<Future<T, E>>) -> Future<Vec<T>, E> {
        let (combined, resolve, reject) = Future::pending(scheduler);
        let total = futures.len();
        debug!(future = %combined.id(), members = total, "all");

        if total == 0 {
            resolve.resolve(Vec::new());
            return combined;
        }

        let collected = Arc::new(Mutex::new(Collected {
            values: vec![None; total],
            remaining: total,
        }));

        for (index, member) in futures.into_iter().enumerate() {
            let collected = Arc::clone(&collected);
            let resolve = resolve.clone();
            let reject = reject.clone();
            member.when_settled(
                move |value| {
                    let finished = {
                        let mut collected = collected.lock();
                        collected.values[index] = Some(value);
                        collected.remaining -= 1;
                        (collected.remaining == 0)
                            .then(|| collected.values.drain(..).flatten().collect::<Vec<T>>())
                    };
                    if let Some(values) = finished {
                        resolve.resolve(values);
                    }
                },
                move |error| reject.reject(error),
            );
        }

        combined
    }

    /// Settles the same way as whichever member settles first. Members that
    /// settle in the same turn are decided by input order.
    ///
    /// An empty input never settles.
    pub fn race(scheduler: &SchedulerRef, futures: Vec<Future<T, E>>) -> Self {
        let (winner, resolve, reject) = Self::pending(scheduler);
        debug!(future = %winner.id(), members = futures.len(), "race");
        if futures.is_empty() {
            debug!(future = %winner.id(), "race over no members stays pending");
        }

        for member in futures {
            let resolve = resolve.clone();
            let reject = reject.clone();
            member.when_settled(
                move |value| resolve.resolve(value),
                move |error| reject.reject(error),
            );
        }

        winner
    }

    /// Like [`Future::resolve`], but nothing happens until `delay` has
    /// elapsed. For a chained value the delay gates the start of adoption,
    /// not the adopted future's own completion.
    pub fn resolve_delay(scheduler: &SchedulerRef, value: Outcome<T, E>, delay: Duration) -> Self {
        Self::new(scheduler, |resolve, reject| {
            debug!(delay = ?delay, "resolve_delay");
            scheduler.schedule_after(delay, Task::new(move || value.adopt_into(resolve, reject)));
            Ok(())
        })
    }

    /// Like [`Future::reject`], but the rejection happens after `delay`.
    pub fn reject_delay(scheduler: &SchedulerRef, error: E, delay: Duration) -> Self {
        Self::new(scheduler, |_resolve, reject| {
            debug!(delay = ?delay, "reject_delay");
            scheduler.schedule_after(delay, Task::new(move || reject.reject(error)));
            Ok(())
        })
    }
}
