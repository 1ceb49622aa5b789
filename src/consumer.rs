//! Awaitable view of a container.
//!
//! A [`Consumer`] bridges a settlement into `async` code: it is an ordinary
//! reaction pair under the hood, so it observes exactly what any `then`
//! registration would, and it can be cloned so several tasks can wait on the
//! same cell. It holds no settlement capability; a container nobody ever
//! settles leaves its consumers pending forever.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::promise::{Promise, Reaction};
use crate::value::Value;

/// A cloneable `Future` yielding the settled outcome: `Ok` for fulfillment,
/// `Err` for rejection.
#[derive(Clone)]
pub struct Consumer {
    shared: Arc<Mutex<Shared>>,
}

struct Shared {
    outcome: Option<Result<Value, Value>>,
    // One waker per polling clone. Waking only the most recent poller loses
    // the others.
    wakers: Vec<Waker>,
}

impl Promise {
    /// Returns an awaitable view of this container.
    ///
    /// ```
    /// use futures::executor::block_on;
    /// use promise_cell::{Promise, TaskQueue, Value};
    ///
    /// let queue = TaskQueue::new();
    /// let p = Promise::fulfilled(queue.scheduler(), "🍓");
    /// let consumer = p.consumer();
    /// queue.run_until_idle();
    /// assert_eq!(block_on(consumer), Ok(Value::from("🍓")));
    /// ```
    pub fn consumer(&self) -> Consumer {
        let shared = Arc::new(Mutex::new(Shared {
            outcome: None,
            wakers: Vec::new(),
        }));
        let on_fulfil: Reaction = {
            let shared = shared.clone();
            Box::new(move |value| deliver(&shared, Ok(value)))
        };
        let on_reject: Reaction = {
            let shared = shared.clone();
            Box::new(move |reason| deliver(&shared, Err(reason)))
        };
        self.observe(on_fulfil, on_reject);
        Consumer { shared }
    }
}

fn deliver(shared: &Arc<Mutex<Shared>>, outcome: Result<Value, Value>) {
    let wakers = {
        let mut shared = shared.lock().unwrap();
        shared.outcome = Some(outcome);
        std::mem::take(&mut shared.wakers)
    };
    for waker in wakers {
        waker.wake();
    }
}

impl Future for Consumer {
    type Output = Result<Value, Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.lock().unwrap();
        match &shared.outcome {
            Some(outcome) => Poll::Ready(outcome.clone()),
            None => {
                shared.wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settled = self.shared.lock().unwrap().outcome.is_some();
        f.debug_struct("Consumer").field("settled", &settled).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use futures::executor::block_on;

    use super::*;
    use crate::promise::Promise;
    use crate::scheduler::TaskQueue;

    #[test]
    fn observes_fulfillment() {
        let queue = TaskQueue::new();
        let (p, producer) = Promise::deferred(queue.scheduler());
        let consumer = p.consumer();
        producer.fulfill("🍓");
        queue.run_until_idle();
        assert_eq!(block_on(consumer), Ok(Value::from("🍓")));
    }

    #[test]
    fn observes_rejection() {
        let queue = TaskQueue::new();
        let p = Promise::rejected(queue.scheduler(), "💥");
        let consumer = p.consumer();
        queue.run_until_idle();
        assert_eq!(block_on(consumer), Err(Value::from("💥")));
    }

    #[test]
    fn cloned_consumers_all_observe_the_outcome() {
        let queue = TaskQueue::new();
        let (p, producer) = Promise::deferred(queue.scheduler());
        let one = p.consumer();
        let two = one.clone();

        let waiter1 = thread::spawn(move || block_on(one));
        let waiter2 = thread::spawn(move || block_on(two));

        producer.fulfill(11);
        queue.run_until_idle();

        assert_eq!(waiter1.join().expect("waiter1 panicked"), Ok(Value::Int(11)));
        assert_eq!(waiter2.join().expect("waiter2 panicked"), Ok(Value::Int(11)));
    }

    #[test]
    fn consumer_registered_after_settlement_still_observes() {
        let queue = TaskQueue::new();
        let p = Promise::fulfilled(queue.scheduler(), 1);
        queue.run_until_idle();
        let consumer = p.consumer();
        queue.run_until_idle();
        assert_eq!(block_on(consumer), Ok(Value::Int(1)));
    }
}
