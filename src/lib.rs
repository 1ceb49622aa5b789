//! Settle-once deferred values with chaining, adoption and thenable interop.
//!
//! A [`Promise`] is a container for a value that does not exist yet. One
//! [`Producer`] settles it exactly once, as fulfilled or rejected; any number
//! of consumers attach reactions with [`Promise::then`] before or after that
//! happens. Every reaction observes the same outcome, exactly once, in
//! registration order, and never on the call stack that registered it:
//! dispatch always goes through an injected [`Scheduler`].
//!
//! Settling with another container makes the cell wait for it and adopt its
//! outcome. Feeding a chain an arbitrary object is handled by duck-typed
//! probing: anything exposing a callable `then` member ([`ObjectLike`]) is
//! unwrapped recursively, with first-decision-wins protection against
//! thenables that call back twice, call both callbacks, or raise mid-call.
//! A cell asked to adopt itself rejects with [`Error::ChainingCycle`].
//!
//! # Example
//!
//! ```
//! use promise_cell::{handler, Promise, State, TaskQueue, Value};
//!
//! let queue = TaskQueue::new();
//! let doubled = Promise::new(queue.scheduler(), |producer| {
//!     producer.fulfill(21);
//!     Ok(())
//! })
//! .then(
//!     Some(handler(|v| Ok(Value::from(v.as_int().unwrap_or(0) * 2)))),
//!     None,
//! );
//!
//! assert_eq!(doubled.state(), State::Pending);
//! queue.run_until_idle();
//! assert_eq!(doubled.state(), State::Fulfilled(Value::Int(42)));
//! ```
//!
//! The crate never blocks and never spawns threads; all apparent concurrency
//! is the interleaving of tasks on whatever scheduler the containers were
//! created with. [`TaskQueue`] is a manual FIFO scheduler that makes that
//! interleaving fully deterministic, which the tests lean on throughout.

#![warn(missing_docs)]

mod consumer;
mod error;
mod promise;
mod resolve;
mod scheduler;
mod value;

pub use consumer::Consumer;
pub use error::Error;
pub use promise::{handler, Handler, Producer, Promise, State};
pub use scheduler::{QueueConfig, Scheduler, Task, TaskQueue};
pub use value::{ObjectLike, SettleFn, ThenFn, ThenProbe, Value};
