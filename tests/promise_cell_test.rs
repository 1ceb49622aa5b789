#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use promise_cell::{handler, Error, Promise, State, TaskQueue, Value};

    #[test]
    fn repeated_settlement_keeps_the_first_outcome() {
        let queue = TaskQueue::new();
        let (p, producer) = Promise::deferred(queue.scheduler());
        producer.reject("first");
        producer.fulfill("second");
        producer.reject("third");
        queue.run_until_idle();
        assert_eq!(p.state(), State::Rejected(Value::from("first")));

        // Settling again after the drain changes nothing either.
        producer.fulfill("fourth");
        queue.run_until_idle();
        assert_eq!(p.state(), State::Rejected(Value::from("first")));
    }

    #[test]
    fn racing_producers_settle_exactly_once() {
        let queue = TaskQueue::new();
        let (p, producer) = Promise::deferred(queue.scheduler());
        let winner = producer.clone();
        let loser = producer;
        let t1 = thread::spawn(move || winner.fulfill(1));
        let t2 = thread::spawn(move || loser.reject("beaten"));
        t1.join().expect("fulfilling thread panicked");
        t2.join().expect("rejecting thread panicked");
        queue.run_until_idle();

        let state = p.state();
        assert!(
            state == State::Fulfilled(Value::Int(1)) || state == State::Rejected(Value::from("beaten")),
            "unexpected state {state:?}"
        );
    }

    #[test]
    fn reactions_fire_in_registration_order_across_chains() {
        let queue = TaskQueue::new();
        let (p, producer) = Promise::deferred(queue.scheduler());
        let log = Arc::new(Mutex::new(Vec::new()));
        for n in 0..5_i64 {
            let log = log.clone();
            p.then(
                Some(handler(move |v| {
                    log.lock().unwrap().push(n);
                    Ok(v)
                })),
                None,
            );
        }
        producer.fulfill(0);
        queue.run_until_idle();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn identity_chain_preserves_the_value() {
        let queue = TaskQueue::new();
        let p = Promise::fulfilled(queue.scheduler(), "kept")
            .then(Some(handler(Ok)), None)
            .then(None, None);
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::from("kept")));
    }

    #[test]
    fn chained_increment() {
        let queue = TaskQueue::new();
        let p = Promise::new(queue.scheduler(), |producer| {
            producer.fulfill(1);
            Ok(())
        })
        .then(
            Some(handler(|v| Ok(Value::from(v.as_int().unwrap_or(0) + 1)))),
            None,
        );
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::Int(2)));
    }

    #[test]
    fn rejection_recovers_through_the_reject_handler() {
        let queue = TaskQueue::new();
        let p = Promise::new(queue.scheduler(), |producer| {
            producer.reject("boom");
            Ok(())
        })
        .then(
            None,
            Some(handler(|reason| {
                Ok(Value::from(
                    reason.as_str().unwrap_or_default().to_uppercase(),
                ))
            })),
        );
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::from("BOOM")));
    }

    #[test]
    fn executor_raising_rejects_without_a_capability_call() {
        let queue = TaskQueue::new();
        let p = Promise::new(queue.scheduler(), |_| Err(Value::from("ctor blew")));
        queue.run_until_idle();
        assert_eq!(p.state(), State::Rejected(Value::from("ctor blew")));
    }

    #[test]
    fn rejection_skips_fulfil_handlers_until_caught() {
        let queue = TaskQueue::new();
        let skipped = Arc::new(Mutex::new(0));
        let count = |skipped: &Arc<Mutex<i32>>| {
            let skipped = skipped.clone();
            handler(move |v| {
                *skipped.lock().unwrap() += 1;
                Ok(v)
            })
        };
        let p = Promise::rejected(queue.scheduler(), "fall through")
            .then(Some(count(&skipped)), None)
            .then(Some(count(&skipped)), None)
            .catch(handler(Ok));
        queue.run_until_idle();
        assert_eq!(*skipped.lock().unwrap(), 0);
        assert_eq!(p.state(), State::Fulfilled(Value::from("fall through")));
    }

    #[test]
    fn adopting_a_container_that_later_rejects() {
        let queue = TaskQueue::new();
        let (outer, outer_producer) = Promise::deferred(queue.scheduler());
        let (inner, inner_producer) = Promise::deferred(queue.scheduler());

        outer_producer.fulfill(inner.clone());
        queue.run_until_idle();
        assert_eq!(outer.state(), State::Pending, "outer must wait for inner");

        inner_producer.reject("x");
        queue.run_until_idle();
        assert_eq!(outer.state(), State::Rejected(Value::from("x")));
    }

    #[test]
    fn resolving_a_derived_container_with_itself_rejects() {
        let queue = TaskQueue::new();
        let slot: Arc<Mutex<Option<Promise>>> = Arc::new(Mutex::new(None));
        let derived = {
            let slot = slot.clone();
            Promise::fulfilled(queue.scheduler(), 1).then(
                Some(handler(move |_| {
                    let me = slot.lock().unwrap().take().expect("derived stored");
                    Ok(Value::Promise(me))
                })),
                None,
            )
        };
        *slot.lock().unwrap() = Some(derived.clone());
        queue.run_until_idle();
        assert_eq!(
            derived.state(),
            State::Rejected(Value::Fault(Error::ChainingCycle))
        );
    }

    #[test]
    fn thenable_deciding_on_a_later_turn() {
        let queue = TaskQueue::new();
        let lazy = {
            let sched = queue.scheduler();
            Value::thenable(move |resolve_cb, _| {
                sched.schedule(Box::new(move || resolve_cb(Value::Int(42))));
                Ok(())
            })
        };
        let p = Promise::fulfilled(queue.scheduler(), 0).then(
            Some(handler(move |_| Ok(lazy))),
            None,
        );
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::Int(42)));
    }

    #[test]
    fn thenable_calling_back_twice_is_reduced_to_the_first_call() {
        let queue = TaskQueue::new();
        let pushy = Value::thenable(|resolve_cb, reject_cb| {
            resolve_cb(Value::Int(42));
            resolve_cb(Value::Int(99));
            reject_cb(Value::from("ignored"));
            Ok(())
        });
        let p = Promise::fulfilled(queue.scheduler(), 0)
            .then(Some(handler(move |_| Ok(pushy))), None);
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::Int(42)));
    }

    #[test]
    fn capability_fulfillment_stores_a_thenable_untouched() {
        let queue = TaskQueue::new();
        let obj = Value::thenable(|resolve_cb, _| {
            resolve_cb(Value::Int(5));
            Ok(())
        });
        let (p, producer) = Promise::deferred(queue.scheduler());
        producer.fulfill(obj.clone());
        queue.run_until_idle();
        // The capability only adopts containers; a thenable is an outcome.
        assert_eq!(p.state(), State::Fulfilled(obj));

        // A chain built on it probes and unwraps.
        let unwrapped = p.then(None, None);
        queue.run_until_idle();
        assert_eq!(unwrapped.state(), State::Fulfilled(Value::Int(5)));
    }

    #[test]
    fn long_chain_settles_in_one_drain() {
        let queue = TaskQueue::new();
        let mut p = Promise::fulfilled(queue.scheduler(), 0);
        for _ in 0..32 {
            p = p.then(
                Some(handler(|v| Ok(Value::from(v.as_int().unwrap_or(0) + 1)))),
                None,
            );
        }
        queue.run_until_idle();
        assert_eq!(p.state(), State::Fulfilled(Value::Int(32)));
    }

    #[test]
    fn settlement_is_never_synchronous_with_registration() {
        let queue = TaskQueue::new();
        let p = Promise::fulfilled(queue.scheduler(), 1);
        queue.run_until_idle();
        assert!(p.state().is_fulfilled());

        let observed = Arc::new(Mutex::new(false));
        let flag = observed.clone();
        let derived = p.then(
            Some(handler(move |v| {
                *flag.lock().unwrap() = true;
                Ok(v)
            })),
            None,
        );
        // Still queued, even though the receiver settled long ago.
        assert!(!*observed.lock().unwrap());
        assert_eq!(derived.state(), State::Pending);
        queue.run_until_idle();
        assert!(*observed.lock().unwrap());
        assert!(derived.state().is_fulfilled());
    }
}
