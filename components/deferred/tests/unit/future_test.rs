//! Unit tests for Future construction, settlement and chaining

use crate::support::virtual_loop;
use deferred::{Future, FutureState, Outcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Fut = Future<i32, String>;

#[test]
fn new_future_is_pending() {
    let (_el, s) = virtual_loop();
    let (future, _resolve, _reject) = Fut::pending(&s);
    assert_eq!(future.state(), FutureState::Pending);
    assert!(future.is_pending());
    assert!(future.outcome().is_none());
}

#[test]
fn continuations_reach_the_same_scheduler() {
    let (mut el, s) = virtual_loop();
    let start = Fut::resolve(&s, Outcome::Plain(3));
    let derived = start.and_then(|v| Ok(Outcome::Plain(v + 1)));
    assert!(Arc::ptr_eq(start.scheduler(), &s));
    assert!(Arc::ptr_eq(derived.scheduler(), &s));

    let inner = derived.scheduler().clone();
    let delayed = derived.and_then(move |v| {
        Ok(Outcome::Chained(Future::resolve_delay(
            &inner,
            Outcome::Plain(v * 10),
            Duration::from_millis(5),
        )))
    });
    el.run_until_done().unwrap();
    assert_eq!(delayed.value(), Some(40));
    assert_eq!(el.now(), Duration::from_millis(5));
}

#[test]
fn executor_runs_synchronously() {
    let (_el, s) = virtual_loop();
    let ran = Arc::new(Mutex::new(false));
    let r = ran.clone();
    let _future = Fut::new(&s, move |_resolve, _reject| {
        *r.lock().unwrap() = true;
        Ok(())
    });
    assert!(*ran.lock().unwrap());
}

#[test]
fn executor_resolve_fulfills() {
    let (_el, s) = virtual_loop();
    let future = Fut::new(&s, |resolve, _| {
        resolve.resolve(42);
        Ok(())
    });
    assert_eq!(future.state(), FutureState::Fulfilled);
    assert_eq!(future.value(), Some(42));
}

#[test]
fn executor_error_rejects() {
    let (_el, s) = virtual_loop();
    let future = Fut::new(&s, |_, _| Err("exploded".to_string()));
    assert_eq!(future.state(), FutureState::Rejected);
    assert_eq!(future.error(), Some("exploded".to_string()));
}

#[test]
fn executor_error_after_resolve_is_ignored() {
    let (_el, s) = virtual_loop();
    let future = Fut::new(&s, |resolve, _| {
        resolve.resolve(1);
        Err("too late".to_string())
    });
    assert_eq!(future.outcome(), Some(Ok(1)));
}

#[test]
fn cannot_resolve_already_fulfilled_future() {
    let (_el, s) = virtual_loop();
    let (future, resolve, _) = Fut::pending(&s);
    resolve.resolve(42);
    resolve.resolve(100);
    assert_eq!(future.value(), Some(42));
}

#[test]
fn cannot_reject_already_fulfilled_future() {
    let (_el, s) = virtual_loop();
    let (future, resolve, reject) = Fut::pending(&s);
    resolve.resolve(42);
    reject.reject("ignored".to_string());
    assert_eq!(future.state(), FutureState::Fulfilled);
    assert_eq!(future.error(), None);
}

#[test]
fn cannot_resolve_already_rejected_future() {
    let (_el, s) = virtual_loop();
    let (future, resolve, reject) = Fut::pending(&s);
    reject.reject("first".to_string());
    resolve.resolve(42);
    assert_eq!(future.outcome(), Some(Err("first".to_string())));
}

#[test]
fn late_settlement_does_not_retrigger_waiters() {
    let (mut el, s) = virtual_loop();
    let (future, resolve, reject) = Fut::pending(&s);
    let calls = Arc::new(Mutex::new(vec![]));

    let c = calls.clone();
    let c2 = calls.clone();
    let _chained = future.then(
        move |v| {
            c.lock().unwrap().push(format!("ok {}", v));
            Ok(Outcome::Plain(v))
        },
        move |e| {
            c2.lock().unwrap().push(format!("err {}", e));
            Err(e)
        },
    );

    resolve.resolve(1);
    el.run_until_done().unwrap();
    resolve.resolve(2);
    reject.reject("late".to_string());
    el.run_until_done().unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["ok 1".to_string()]);
}

#[test]
fn then_returns_before_continuation_runs() {
    let (mut el, s) = virtual_loop();
    let order = Arc::new(Mutex::new(vec![]));
    let future = Fut::resolve(&s, Outcome::Plain(1));

    let o = order.clone();
    let _chained = future.and_then(move |v| {
        o.lock().unwrap().push("continuation");
        Ok(Outcome::Plain(v))
    });
    order.lock().unwrap().push("after then");

    el.run_until_done().unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["after then", "continuation"]);
}

#[test]
fn then_on_settled_future_schedules_microtask() {
    let (el, s) = virtual_loop();
    let future = Fut::resolve(&s, Outcome::Plain(1));
    let chained = future.and_then(|v| Ok(Outcome::Plain(v + 1)));
    assert_eq!(el.pending_microtasks(), 1);
    assert!(chained.is_pending());
}

#[test]
fn then_on_pending_future_defers_until_settlement() {
    let (mut el, s) = virtual_loop();
    let (future, resolve, _) = Fut::pending(&s);
    let chained = future.and_then(|v| Ok(Outcome::Plain(v + 1)));

    assert_eq!(el.pending_microtasks(), 0);
    el.run_until_done().unwrap();
    assert!(chained.is_pending());

    resolve.resolve(41);
    assert!(chained.is_pending());
    el.run_until_done().unwrap();
    assert_eq!(chained.value(), Some(42));
}

#[test]
fn waiters_run_in_registration_order() {
    let (mut el, s) = virtual_loop();
    let (future, resolve, _) = Fut::pending(&s);
    let order = Arc::new(Mutex::new(vec![]));

    for tag in 0..5 {
        let o = order.clone();
        let _ = future.and_then(move |v| {
            o.lock().unwrap().push(tag);
            Ok(Outcome::Plain(v))
        });
    }

    resolve.resolve(0);
    el.run_until_done().unwrap();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn then_maps_value_type() {
    let (mut el, s) = virtual_loop();
    let future = Fut::resolve(&s, Outcome::Plain(7));
    let described: Future<String, String> =
        future.and_then(|v| Ok(Outcome::Plain(format!("value {}", v))));
    el.run_until_done().unwrap();
    assert_eq!(described.value(), Some("value 7".to_string()));
}

#[test]
fn continuation_error_rejects_derived() {
    let (mut el, s) = virtual_loop();
    let future = Fut::resolve(&s, Outcome::Plain(1));
    let chained: Fut = future.and_then(|_| Err("continuation failed".to_string()));
    el.run_until_done().unwrap();
    assert_eq!(chained.error(), Some("continuation failed".to_string()));
}

#[test]
fn rejection_passes_through_fulfillment_only_links() {
    let (mut el, s) = virtual_loop();
    let touched = Arc::new(Mutex::new(false));
    let t = touched.clone();

    let tail = Fut::reject(&s, "root cause".to_string())
        .and_then(move |v| {
            *t.lock().unwrap() = true;
            Ok(Outcome::Plain(v + 1))
        })
        .and_then(|v| Ok(Outcome::Plain(v * 10)));

    el.run_until_done().unwrap();
    assert!(!*touched.lock().unwrap());
    assert_eq!(tail.error(), Some("root cause".to_string()));
}

#[test]
fn rejection_handler_recovers() {
    let (mut el, s) = virtual_loop();
    let recovered = Fut::reject(&s, "boom".to_string())
        .then(|v| Ok(Outcome::Plain(v)), |e| Ok(Outcome::Plain(e.len() as i32)));
    el.run_until_done().unwrap();
    assert_eq!(recovered.value(), Some(4));
}

#[test]
fn catch_passes_fulfillment_through() {
    let (mut el, s) = virtual_loop();
    let caught = Fut::resolve(&s, Outcome::Plain(3)).catch(|_| Ok(Outcome::Plain(-1)));
    el.run_until_done().unwrap();
    assert_eq!(caught.value(), Some(3));
}

#[test]
fn catch_matches_then_with_identity() {
    let (mut el, s) = virtual_loop();
    let source = Fut::reject(&s, "bad".to_string());

    let via_catch = source.catch(|e| Ok(Outcome::Plain(e.len() as i32)));
    let via_then = source.then(
        |v| Ok(Outcome::Plain(v)),
        |e| Ok(Outcome::Plain(e.len() as i32)),
    );
    let rethrown_catch = source.catch(|e| Err(format!("{}!", e)));
    let rethrown_then = source.then(|v| Ok(Outcome::Plain(v)), |e| Err(format!("{}!", e)));

    el.run_until_done().unwrap();
    assert_eq!(via_catch.outcome(), via_then.outcome());
    assert_eq!(via_catch.value(), Some(3));
    assert_eq!(rethrown_catch.outcome(), rethrown_then.outcome());
    assert_eq!(rethrown_catch.error(), Some("bad!".to_string()));
}

#[test]
fn chained_future_is_flattened() {
    let (mut el, s) = virtual_loop();
    let inner_scheduler = s.clone();
    let doubled = Fut::resolve(&s, Outcome::Plain(21)).and_then(move |v| {
        Ok(Outcome::Chained(Fut::resolve_delay(
            &inner_scheduler,
            Outcome::Plain(v * 2),
            Duration::from_millis(10),
        )))
    });

    el.advance(Duration::from_millis(9)).unwrap();
    assert!(doubled.is_pending());

    el.advance(Duration::from_millis(1)).unwrap();
    assert_eq!(doubled.value(), Some(42));
}

#[test]
fn chained_rejection_is_adopted() {
    let (mut el, s) = virtual_loop();
    let inner_scheduler = s.clone();
    let chained = Fut::resolve(&s, Outcome::Plain(1)).and_then(move |_| {
        Ok(Outcome::Chained(Fut::reject_delay(
            &inner_scheduler,
            "inner failed".to_string(),
            Duration::from_millis(5),
        )))
    });

    el.run_until_done().unwrap();
    assert_eq!(chained.error(), Some("inner failed".to_string()));
    assert_eq!(el.now(), Duration::from_millis(5));
}

#[test]
fn chained_future_may_already_be_settled() {
    let (mut el, s) = virtual_loop();
    let ready = Fut::resolve(&s, Outcome::Plain(9));
    let chained = Fut::resolve(&s, Outcome::Plain(0)).and_then(move |_| Ok(Outcome::Chained(ready)));
    el.run_until_done().unwrap();
    assert_eq!(chained.value(), Some(9));
}

#[test]
fn resolve_from_another_thread() {
    let (mut el, s) = virtual_loop();
    let (future, resolve, _) = Fut::pending(&s);
    let chained = future.and_then(|v| Ok(Outcome::Plain(v + 1)));

    std::thread::spawn(move || resolve.resolve(99))
        .join()
        .unwrap();

    el.run_until_done().unwrap();
    assert_eq!(chained.value(), Some(100));
}

#[test]
fn racing_settlers_pick_exactly_one_winner() {
    let (_el, s) = virtual_loop();
    let (future, resolve, reject) = Fut::pending(&s);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let resolve = resolve.clone();
            let reject = reject.clone();
            std::thread::spawn(move || {
                if i % 2 == 0 {
                    resolve.resolve(i);
                } else {
                    reject.reject(format!("thread {}", i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let first = future.outcome();
    assert!(first.is_some());
    assert_eq!(future.outcome(), first);
}
