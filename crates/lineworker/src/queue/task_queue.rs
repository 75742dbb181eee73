use super::Worker;
use crate::WorkerError;
use core::num::NonZeroUsize;
use std::{collections::VecDeque, sync::Arc};
use tokio::task::JoinSet;

/// Notification emitted by a [`TaskQueue`].
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// Dispatch emptied the pending list. Tasks may still be running.
    Empty,
    /// Nothing is pending and nothing is running.
    Drain,
    /// A task returned an error or panicked.
    Failed(WorkerError),
}

/// A bounded concurrent task queue.
///
/// Tasks are dispatched to the [`Worker`] in push order, each on its own
/// Tokio task, with at most `concurrency` running at once. Tasks beyond that
/// wait in an ordered pending list. Completion order is whatever order the
/// worker futures finish in.
///
/// State changes are observed through [`TaskQueue::next_event`], which also
/// drives dispatch: a slot freed by a finished task is refilled from the
/// pending list when the completion is collected there.
pub struct TaskQueue<T, W> {
    worker: Arc<W>,
    concurrency: NonZeroUsize,
    pending: VecDeque<T>,
    running: JoinSet<Result<(), crate::BoxError>>,
    events: VecDeque<QueueEvent>,
    dispatched: u64,
    completed: u64,
    failed: u64,
}

impl<T, W> TaskQueue<T, W>
where
    T: Send + 'static,
    W: Worker<T>,
{
    pub fn new(worker: W, concurrency: NonZeroUsize) -> Self {
        Self {
            worker: Arc::new(worker),
            concurrency,
            pending: VecDeque::new(),
            running: JoinSet::new(),
            events: VecDeque::new(),
            dispatched: 0,
            completed: 0,
            failed: 0,
        }
    }

    /// Appends a task and starts it immediately if a slot is free.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn push(&mut self, task: T) {
        self.pending.push_back(task);
        self.dispatch();
    }

    /// Number of tasks waiting for a free slot.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of tasks started and not yet collected by [`TaskQueue::next_event`].
    ///
    /// A task that has finished counts until its result is collected.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub const fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Returns `true` if nothing is pending and nothing is running.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty()
    }

    pub const fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub const fn completed(&self) -> u64 {
        self.completed
    }

    pub const fn failed(&self) -> u64 {
        self.failed
    }

    /// Drops every task that has not started yet. Running tasks are
    /// unaffected.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Lets running tasks finish in the background once the queue is dropped.
    ///
    /// Without this, dropping the queue aborts every running task.
    pub fn detach_running(&mut self) {
        self.running.detach_all();
    }

    /// Waits for the next queue notification.
    ///
    /// Resolves only when something happened: a queued `Empty`, a task
    /// failure, or a drain. On an idle queue with no queued notification the
    /// future never resolves. This future is cancel-safe.
    pub async fn next_event(&mut self) -> QueueEvent {
        loop {
            if let Some(event) = self.events.pop_front() {
                return event;
            }

            let Some(joined) = self.running.join_next().await else {
                return core::future::pending().await;
            };

            self.completed += 1;
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.failed += 1;
                    self.events.push_back(QueueEvent::Failed(Arc::from(e)));
                }
                Err(join_err) => {
                    self.failed += 1;
                    self.events.push_back(QueueEvent::Failed(Arc::new(join_err)));
                }
            }

            self.dispatch();
            if self.is_idle() {
                self.events.push_back(QueueEvent::Drain);
            }
        }
    }

    fn dispatch(&mut self) {
        let mut started = false;
        while self.running.len() < self.concurrency.get() {
            let Some(task) = self.pending.pop_front() else {
                break;
            };
            let worker = Arc::clone(&self.worker);
            self.running.spawn(async move { worker.process(task).await });
            self.dispatched += 1;
            started = true;
        }

        if started
            && self.pending.is_empty()
            && !matches!(self.events.back(), Some(QueueEvent::Empty))
        {
            self.events.push_back(QueueEvent::Empty);
        }
    }
}

impl<T, W> core::fmt::Debug for TaskQueue<T, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("concurrency", &self.concurrency)
            .field("pending", &self.pending.len())
            .field("running", &self.running.len())
            .field("dispatched", &self.dispatched)
            .field("completed", &self.completed)
            .field("failed", &self.failed)
            .finish()
    }
}
