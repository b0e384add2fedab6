//! The settle-once future primitive.
//!
//! A [`Future`] starts out pending and settles exactly once, either
//! fulfilled with a value or rejected with an error. Continuations attached
//! with [`Future::then`] never run on the caller's stack: they are handed to
//! the future's [`Scheduler`](crate::Scheduler) and run after the current
//! call returns.

use crate::scheduler::SchedulerRef;
use crate::task_queue::MicroTask;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// The state of a Future.
///
/// Once settled (Fulfilled or Rejected), a Future cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    /// The initial state; the future is neither fulfilled nor rejected.
    Pending,
    /// The future has been resolved with a value.
    Fulfilled,
    /// The future has been rejected with an error.
    Rejected,
}

impl fmt::Display for FutureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fulfilled => f.write_str("fulfilled"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// Process-unique identifier of a future, used in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FutureId(u64);

impl FutureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "future#{}", self.0)
    }
}

/// What a continuation hands back: a plain value, or another future whose
/// eventual outcome should be adopted.
pub enum Outcome<T, E> {
    /// Fulfill with this value.
    Plain(T),
    /// Settle the same way this future settles.
    Chained(Future<T, E>),
}

impl<T, E> From<Future<T, E>> for Outcome<T, E> {
    fn from(future: Future<T, E>) -> Self {
        Outcome::Chained(future)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Outcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Outcome::Chained(future) => f.debug_tuple("Chained").field(&future.id()).finish(),
        }
    }
}

impl<T, E> Outcome<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Settles `resolve`/`reject` from this outcome, following a chained
    /// future to its eventual state.
    pub(crate) fn adopt_into(self, resolve: Resolve<T, E>, reject: Reject<T, E>) {
        match self {
            Outcome::Plain(value) => resolve.resolve(value),
            Outcome::Chained(future) => future.when_settled(
                move |value| resolve.resolve(value),
                move |error| reject.reject(error),
            ),
        }
    }
}

enum Settlement<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T: Clone, E: Clone> Settlement<T, E> {
    fn snapshot(&self) -> Option<Result<T, E>> {
        match self {
            Settlement::Pending => None,
            Settlement::Fulfilled(value) => Some(Ok(value.clone())),
            Settlement::Rejected(error) => Some(Err(error.clone())),
        }
    }
}

struct Waiter<T, E> {
    on_fulfilled: Box<dyn FnOnce(T) + Send>,
    on_rejected: Box<dyn FnOnce(E) + Send>,
}

struct Cell<T, E> {
    id: FutureId,
    settlement: Settlement<T, E>,
    waiters: Vec<Waiter<T, E>>,
}

type SharedCell<T, E> = Arc<Mutex<Cell<T, E>>>;

fn settle<T, E>(cell: &SharedCell<T, E>, scheduler: &SchedulerRef, result: Result<T, E>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (id, waiters) = {
        let mut cell = cell.lock();
        if !matches!(cell.settlement, Settlement::Pending) {
            trace!(future = %cell.id, "settlement ignored, already settled");
            return;
        }
        cell.settlement = match &result {
            Ok(value) => Settlement::Fulfilled(value.clone()),
            Err(error) => Settlement::Rejected(error.clone()),
        };
        (cell.id, std::mem::take(&mut cell.waiters))
    };

    trace!(
        future = %id,
        fulfilled = result.is_ok(),
        waiters = waiters.len(),
        "future settled"
    );
    if waiters.is_empty() {
        return;
    }

    scheduler.schedule(MicroTask::new(move || match result {
        Ok(value) => {
            for waiter in waiters {
                (waiter.on_fulfilled)(value.clone());
            }
        }
        Err(error) => {
            for waiter in waiters {
                (waiter.on_rejected)(error.clone());
            }
        }
    }));
}

/// Capability that fulfills a future.
///
/// Calls after the future has settled are ignored.
pub struct Resolve<T, E> {
    cell: SharedCell<T, E>,
    scheduler: SchedulerRef,
}

impl<T, E> Resolve<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills the future with `value` if it is still pending.
    pub fn resolve(&self, value: T) {
        settle(&self.cell, &self.scheduler, Ok(value));
    }
}

impl<T, E> Clone for Resolve<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

/// Capability that rejects a future.
///
/// Calls after the future has settled are ignored.
pub struct Reject<T, E> {
    cell: SharedCell<T, E>,
    scheduler: SchedulerRef,
}

impl<T, E> Reject<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Rejects the future with `error` if it is still pending.
    pub fn reject(&self, error: E) {
        settle(&self.cell, &self.scheduler, Err(error));
    }
}

impl<T, E> Clone for Reject<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

/// A deferred value that is eventually fulfilled with `T` or rejected with `E`.
///
/// Cloning a `Future` yields another handle to the same state.
///
/// # Examples
///
/// ```
/// use deferred::{EventLoop, Future, FutureState, Outcome};
///
/// let mut event_loop = EventLoop::virtual_time();
/// let scheduler = event_loop.scheduler();
///
/// let doubled = Future::<i32, String>::new(&scheduler, |resolve, _reject| {
///     resolve.resolve(21);
///     Ok(())
/// })
/// .then(|v| Ok(Outcome::Plain(v * 2)), |e| Err(e));
///
/// assert_eq!(doubled.state(), FutureState::Pending);
/// event_loop.run_until_done().unwrap();
/// assert_eq!(doubled.value(), Some(42));
/// ```
pub struct Future<T, E> {
    cell: SharedCell<T, E>,
    scheduler: SchedulerRef,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cell = self.cell.lock();
        let state = match cell.settlement {
            Settlement::Pending => FutureState::Pending,
            Settlement::Fulfilled(_) => FutureState::Fulfilled,
            Settlement::Rejected(_) => FutureState::Rejected,
        };
        f.debug_struct("Future")
            .field("id", &cell.id)
            .field("state", &state)
            .field("waiters", &cell.waiters.len())
            .finish()
    }
}

impl<T, E> Future<T, E> {
    /// Identifier used for this future in log output.
    pub fn id(&self) -> FutureId {
        self.cell.lock().id
    }

    /// The current state of the future.
    pub fn state(&self) -> FutureState {
        match self.cell.lock().settlement {
            Settlement::Pending => FutureState::Pending,
            Settlement::Fulfilled(_) => FutureState::Fulfilled,
            Settlement::Rejected(_) => FutureState::Rejected,
        }
    }

    /// Returns true while the future has not settled.
    pub fn is_pending(&self) -> bool {
        self.state() == FutureState::Pending
    }

    /// The scheduler continuations of this future are deferred onto.
    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a future and runs `executor` synchronously with its resolve
    /// and reject capabilities.
    ///
    /// An `Err` returned by the executor rejects the future, unless the
    /// executor already settled it.
    pub fn new<F>(scheduler: &SchedulerRef, executor: F) -> Self
    where
        F: FnOnce(Resolve<T, E>, Reject<T, E>) -> Result<(), E>,
    {
        let (future, resolve, reject) = Self::pending(scheduler);
        if let Err(error) = executor(resolve, reject.clone()) {
            reject.reject(error);
        }
        future
    }

    /// Creates a pending future together with the capabilities that settle it.
    pub fn pending(scheduler: &SchedulerRef) -> (Self, Resolve<T, E>, Reject<T, E>) {
        let cell = Arc::new(Mutex::new(Cell {
            id: FutureId::next(),
            settlement: Settlement::Pending,
            waiters: Vec::new(),
        }));
        let future = Self {
            cell: Arc::clone(&cell),
            scheduler: Arc::clone(scheduler),
        };
        let resolve = Resolve {
            cell: Arc::clone(&cell),
            scheduler: Arc::clone(scheduler),
        };
        let reject = Reject {
            cell,
            scheduler: Arc::clone(scheduler),
        };
        (future, resolve, reject)
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &self.cell.lock().settlement {
            Settlement::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection error, if rejected.
    pub fn error(&self) -> Option<E> {
        match &self.cell.lock().settlement {
            Settlement::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// `Some(Ok(value))` or `Some(Err(error))` once settled, `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        self.cell.lock().settlement.snapshot()
    }

    /// Attaches raw callbacks: deferred through the scheduler if already
    /// settled, otherwise registered as a waiter that runs inside the
    /// settlement microtask.
    pub(crate) fn when_settled<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + Send + 'static,
        R: FnOnce(E) + Send + 'static,
    {
        let mut cell = self.cell.lock();
        let Some(settled) = cell.settlement.snapshot() else {
            trace!(
                future = %cell.id,
                waiters = cell.waiters.len() + 1,
                "waiter registered"
            );
            cell.waiters.push(Waiter {
                on_fulfilled: Box::new(on_fulfilled),
                on_rejected: Box::new(on_rejected),
            });
            return;
        };
        drop(cell);

        let task = match settled {
            Ok(value) => MicroTask::new(move || on_fulfilled(value)),
            Err(error) => MicroTask::new(move || on_rejected(error)),
        };
        self.scheduler.schedule(task);
    }

    /// Chains continuations onto this future.
    ///
    /// Returns a new future settled from whichever continuation runs: an
    /// `Err` rejects it, `Outcome::Plain` fulfills it, and
    /// `Outcome::Chained` makes it adopt the returned future's outcome.
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Outcome<U, E>, E> + Send + 'static,
        R: FnOnce(E) -> Result<Outcome<U, E>, E> + Send + 'static,
    {
        let (derived, resolve, reject) = Future::pending(&self.scheduler);
        let (resolve_err, reject_err) = (resolve.clone(), reject.clone());

        self.when_settled(
            move |value| handle(on_fulfilled(value), resolve, reject),
            move |error| handle(on_rejected(error), resolve_err, reject_err),
        );
        derived
    }

    /// `then` with the default rejection handler, which passes the error
    /// through unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Outcome<U, E>, E> + Send + 'static,
    {
        self.then(on_fulfilled, |error| Err(error))
    }

    /// `then` with the identity fulfillment handler.
    pub fn catch<R>(&self, on_rejected: R) -> Future<T, E>
    where
        R: FnOnce(E) -> Result<Outcome<T, E>, E> + Send + 'static,
    {
        self.then(|value| Ok(Outcome::Plain(value)), on_rejected)
    }
}

fn handle<U, E>(returned: Result<Outcome<U, E>, E>, resolve: Resolve<U, E>, reject: Reject<U, E>)
where
    U: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    match returned {
        Ok(outcome) => outcome.adopt_into(resolve, reject),
        Err(error) => reject.reject(error),
    }
}
