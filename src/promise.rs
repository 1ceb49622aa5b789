//! The container itself: one shared state cell, the settle-once capability
//! pair, and reaction chaining.
//!
//! A [`Promise`] is a cloneable handle over a single cell. The [`Producer`]
//! bound to the same cell carries the only two ways to settle it, and both
//! defer the visible transition through the cell's [`Scheduler`], so no
//! reaction ever runs inline with the call that caused it.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::error::Error;
use crate::resolve::resolve;
use crate::scheduler::Scheduler;
use crate::value::Value;

/// A reaction body attached through [`Promise::then`]. `Ok` is the handler's
/// result, fed onward through resolution; `Err` is a raised reason and
/// rejects the derived container.
pub type Handler = Box<dyn FnOnce(Value) -> Result<Value, Value> + Send>;

/// Boxes a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
{
    Box::new(f)
}

/// A buffered settlement observer. Exactly one branch of the pair registered
/// for it ever runs, with the settled outcome as argument.
pub(crate) type Reaction = Box<dyn FnOnce(Value) + Send>;

/// Lifecycle of a container. `Pending` is the only state a transition may
/// leave, and it is left at most once.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Not yet settled.
    Pending,
    /// Settled with a success value.
    Fulfilled(Value),
    /// Settled with a failure reason.
    Rejected(Value),
}

impl State {
    /// Whether the container has left `Pending`.
    pub fn is_settled(&self) -> bool {
        !matches!(self, State::Pending)
    }

    /// Whether the container settled on the success branch.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, State::Fulfilled(_))
    }

    /// Whether the container settled on the failure branch.
    pub fn is_rejected(&self) -> bool {
        matches!(self, State::Rejected(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Pending => f.write_str("pending"),
            State::Fulfilled(_) => f.write_str("fulfilled"),
            State::Rejected(_) => f.write_str("rejected"),
        }
    }
}

struct Inner {
    state: State,
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
}

/// A deferred value: pending until its [`Producer`] settles it, then
/// permanently fulfilled or rejected. Clones share the same cell.
#[derive(Clone)]
pub struct Promise {
    cell: Arc<Mutex<Inner>>,
    sched: Arc<dyn Scheduler>,
}

/// The settlement capability pair for one container. Cloneable so it can be
/// handed to whoever is supposed to produce the outcome; whichever call
/// reaches the cell first wins, the rest are no-ops.
#[derive(Clone)]
pub struct Producer {
    cell: Arc<Mutex<Inner>>,
    sched: Arc<dyn Scheduler>,
}

impl Promise {
    fn pending(sched: Arc<dyn Scheduler>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                on_fulfilled: Vec::new(),
                on_rejected: Vec::new(),
            })),
            sched,
        }
    }

    /// Runs `executor` once, synchronously, with the settlement capabilities
    /// for the new container. An `Err` from the executor rejects the
    /// container with that reason, unless a capability already settled it.
    ///
    /// ```
    /// use promise_cell::{Promise, State, TaskQueue, Value};
    ///
    /// let queue = TaskQueue::new();
    /// let p = Promise::new(queue.scheduler(), |producer| {
    ///     producer.fulfill(1);
    ///     Ok(())
    /// });
    /// assert_eq!(p.state(), State::Pending);
    /// queue.run_until_idle();
    /// assert_eq!(p.state(), State::Fulfilled(Value::Int(1)));
    /// ```
    pub fn new<F>(sched: Arc<dyn Scheduler>, executor: F) -> Self
    where
        F: FnOnce(&Producer) -> Result<(), Value>,
    {
        let promise = Self::pending(sched);
        let producer = promise.producer();
        if let Err(raised) = executor(&producer) {
            debug!(origin = "producer", reason = %raised, "executor raised");
            producer.reject(raised);
        }
        promise
    }

    /// A fresh pending container together with its settlement capabilities.
    pub fn deferred(sched: Arc<dyn Scheduler>) -> (Promise, Producer) {
        let promise = Self::pending(sched);
        let producer = promise.producer();
        (promise, producer)
    }

    /// A container already on its way to fulfillment with `value`.
    pub fn fulfilled(sched: Arc<dyn Scheduler>, value: impl Into<Value>) -> Promise {
        let (promise, producer) = Self::deferred(sched);
        producer.fulfill(value);
        promise
    }

    /// A container already on its way to rejection with `reason`.
    pub fn rejected(sched: Arc<dyn Scheduler>, reason: impl Into<Value>) -> Promise {
        let (promise, producer) = Self::deferred(sched);
        producer.reject(reason);
        promise
    }

    /// A snapshot of the current state, outcome included if settled.
    pub fn state(&self) -> State {
        self.cell.lock().unwrap().state.clone()
    }

    /// Whether `self` and `other` are handles to the same cell.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Attaches a reaction pair and returns the derived container.
    ///
    /// `None` for `on_fulfilled` passes the value through unchanged; `None`
    /// for `on_rejected` re-raises the reason unchanged. Whichever handler
    /// runs does so on a later scheduler turn, never inline, and its result
    /// (or raised reason) decides the derived container.
    pub fn then(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Promise {
        let derived = Promise::pending(self.sched.clone());

        let fulfil_side: Reaction = {
            let target = derived.clone();
            Box::new(move |outcome| match on_fulfilled {
                None => resolve(&target, outcome),
                Some(react) => match react(outcome) {
                    Ok(next) => resolve(&target, next),
                    Err(raised) => {
                        trace!(origin = "reaction", reason = %raised, "fulfil handler raised");
                        target.producer().reject(raised);
                    }
                },
            })
        };
        let reject_side: Reaction = {
            let target = derived.clone();
            Box::new(move |reason| match on_rejected {
                None => target.producer().reject(reason),
                Some(react) => match react(reason) {
                    Ok(next) => resolve(&target, next),
                    Err(raised) => {
                        trace!(origin = "reaction", reason = %raised, "reject handler raised");
                        target.producer().reject(raised);
                    }
                },
            })
        };
        self.observe(fulfil_side, reject_side);
        derived
    }

    /// Shorthand for `then(None, Some(on_rejected))`.
    pub fn catch(&self, on_rejected: Handler) -> Promise {
        self.then(None, Some(on_rejected))
    }

    /// Registers a raw observer pair. While pending both sides are buffered
    /// in registration order; on an already-settled cell the matching side is
    /// scheduled immediately with the outcome. Either way the reaction runs
    /// on a later scheduler turn.
    pub(crate) fn observe(&self, on_fulfil: Reaction, on_reject: Reaction) {
        let mut inner = self.cell.lock().unwrap();
        match inner.state.clone() {
            State::Pending => {
                inner.on_fulfilled.push(on_fulfil);
                inner.on_rejected.push(on_reject);
            }
            State::Fulfilled(value) => {
                drop(inner);
                self.sched.schedule(Box::new(move || on_fulfil(value)));
            }
            State::Rejected(reason) => {
                drop(inner);
                self.sched.schedule(Box::new(move || on_reject(reason)));
            }
        }
    }

    pub(crate) fn producer(&self) -> Producer {
        Producer {
            cell: self.cell.clone(),
            sched: self.sched.clone(),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_lock() {
            Ok(inner) => write!(f, "Promise({})", inner.state),
            Err(_) => f.write_str("Promise(<busy>)"),
        }
    }
}

impl Producer {
    /// Settles the container as fulfilled with `value`.
    ///
    /// A container value is never stored directly: the cell waits for it and
    /// adopts its outcome instead, and handing the cell its own handle
    /// rejects with [`Error::ChainingCycle`]. Any plain value schedules the
    /// transition through the cell's scheduler; if the cell has settled by
    /// the time that task runs, nothing happens.
    pub fn fulfill(&self, value: impl Into<Value>) {
        match value.into() {
            Value::Promise(other) => {
                if Arc::ptr_eq(&other.cell, &self.cell) {
                    debug!("container settled with itself");
                    self.reject(Error::ChainingCycle);
                    return;
                }
                trace!("waiting on an adopted container");
                let fulfil: Reaction = {
                    let producer = self.clone();
                    Box::new(move |v| producer.fulfill(v))
                };
                let reject: Reaction = {
                    let producer = self.clone();
                    Box::new(move |r| producer.reject(r))
                };
                other.observe(fulfil, reject);
            }
            value => {
                let cell = self.cell.clone();
                self.sched
                    .schedule(Box::new(move || settle_fulfilled(&cell, value)));
            }
        }
    }

    /// Settles the container as rejected with `reason`, deferred through the
    /// scheduler and a no-op if something else settles the cell first.
    pub fn reject(&self, reason: impl Into<Value>) {
        let reason = reason.into();
        let cell = self.cell.clone();
        self.sched
            .schedule(Box::new(move || settle_rejected(&cell, reason)));
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_lock() {
            Ok(inner) => write!(f, "Producer({})", inner.state),
            Err(_) => f.write_str("Producer(<busy>)"),
        }
    }
}

fn settle_fulfilled(cell: &Arc<Mutex<Inner>>, value: Value) {
    let reactions = {
        let mut inner = cell.lock().unwrap();
        if inner.state.is_settled() {
            trace!("fulfill after settlement ignored");
            return;
        }
        inner.state = State::Fulfilled(value.clone());
        inner.on_rejected.clear();
        std::mem::take(&mut inner.on_fulfilled)
    };
    debug!(branch = "fulfilled", value = %value, reactions = reactions.len(), "container settled");
    for reaction in reactions {
        reaction(value.clone());
    }
}

fn settle_rejected(cell: &Arc<Mutex<Inner>>, reason: Value) {
    let reactions = {
        let mut inner = cell.lock().unwrap();
        if inner.state.is_settled() {
            trace!("reject after settlement ignored");
            return;
        }
        inner.state = State::Rejected(reason.clone());
        inner.on_fulfilled.clear();
        std::mem::take(&mut inner.on_rejected)
    };
    debug!(branch = "rejected", reason = %reason, reactions = reactions.len(), "container settled");
    for reaction in reactions {
        reaction(reason.clone());
    }
}
