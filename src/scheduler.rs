//! The deferred-dispatch boundary.
//!
//! Settlement work is never run inline with the call that caused it; it is
//! handed to a [`Scheduler`] and runs after the current call stack returns.
//! The trait is deliberately tiny so any host facility with ordered,
//! run-later semantics can sit behind it. [`TaskQueue`] is the in-crate
//! implementation: a FIFO queue drained by whoever owns the loop, which also
//! makes every test fully deterministic.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::trace;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// The run-this-later capability.
///
/// Implementations must run the task strictly after the submitting call
/// returns, and must preserve submission order between tasks submitted from
/// the same settlement event. Nothing else is required: no delays, no
/// cancellation, no periodic firing.
pub trait Scheduler: Send + Sync {
    /// Accepts `task` for execution after the current call stack unwinds.
    fn schedule(&self, task: Task);
}

/// Tuning knobs for [`TaskQueue`].
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Upper bound on tasks run by a single [`TaskQueue::run_until_idle`]
    /// call. A settlement graph that keeps feeding itself stops here instead
    /// of spinning forever.
    pub max_tasks_per_drain: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_drain: 100_000,
        }
    }
}

/// A FIFO task queue shared by cloning.
///
/// Tasks may submit further tasks while the queue is draining; they are
/// appended and picked up by the same drain. The queue lock is released
/// around each task, so tasks are free to re-enter the queue or any
/// container.
#[derive(Clone)]
pub struct TaskQueue {
    tasks: Arc<Mutex<VecDeque<Task>>>,
    config: QueueConfig,
}

impl TaskQueue {
    /// An empty queue with the default configuration.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// An empty queue with an explicit drain budget.
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(VecDeque::new())),
            config,
        }
    }

    /// This queue as a shareable [`Scheduler`] handle.
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::new(self.clone())
    }

    /// Number of tasks currently waiting.
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Whether no tasks are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the frontmost task, if any. Returns whether one ran.
    pub fn run_next(&self) -> bool {
        let task = self.tasks.lock().unwrap().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks in order until the queue is empty or the drain budget is
    /// spent, and returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while ran < self.config.max_tasks_per_drain {
            if !self.run_next() {
                break;
            }
            ran += 1;
        }
        if ran > 0 {
            trace!(tasks = ran, "task queue drained");
        }
        ran
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.lock().unwrap().push_back(task);
    }
}
