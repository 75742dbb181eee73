//! Line-driven dispatch into a bounded [`TaskQueue`].
//!
//! [`LineWorker`] pulls lines from a [`LineBuffer`] and pushes them onto a
//! [`TaskQueue`] until either the buffer runs dry or the pending depth reaches
//! `max_queue_size`. Refills are triggered by source readiness and by the
//! queue's `Empty` notification; completion is reported once the source is
//! exhausted and the queue is drained.
//!
//! ## Event loop
//!
//! All notifications are handled by one serial loop (`tokio::select!` over the
//! source, the queue and the shutdown token), so buffer and orchestrator state
//! are never touched concurrently and need no locking. Every handler re-checks
//! the current state, which makes repeated refills harmless.
//!
//! ## Completion
//!
//! A run ends exactly once, with:
//! - `Ok(RunSummary)` once the buffer is finished, nothing is pending and
//!   nothing is running.
//! - [`Error::Source`] as soon as the source fails.
//! - [`Error::Worker`] on the first failed task, if `halt_on_worker_error` is
//!   set.
//! - [`Error::SafetyLimitExceeded`] if a fill pass trips the safety guard.
//! - [`Error::Interrupted`] after the shutdown token is cancelled and the
//!   running tasks have finished.
//!
//! Tasks already running when a run ends early are detached, never aborted.


use crate::{
    ByteSource, ChunkSource, DEFAULT_CHUNK_SIZE, Error, Line, LineBuffer, LineWorkerConfig,
    QueueEvent, Result, SourceEvent, TaskQueue, Worker,
};
use tokio::{io::AsyncRead, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines pulled from the source, including skipped ones.
    pub lines_read: u64,
    /// Empty lines dropped because `skip_empty_lines` was set.
    pub lines_skipped: u64,
    pub tasks_dispatched: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

/// Feeds the lines of a byte source to a worker with bounded concurrency and
/// bounded queue depth.
pub struct LineWorker<S, W> {
    lines: LineBuffer<S>,
    queue: TaskQueue<Line, W>,
    config: LineWorkerConfig,
    shutdown: CancellationToken,
    interrupted: bool,
    skipped: u64,
}

impl<W> LineWorker<ChunkSource, W>
where
    W: Worker<Line>,
{
    /// Builds a worker over an async reader, read in
    /// [`DEFAULT_CHUNK_SIZE`] chunks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn from_reader<R>(reader: R, worker: W, config: LineWorkerConfig) -> Result<Self>
    where
        R: AsyncRead + Send + 'static,
    {
        Self::new(ChunkSource::from_reader(reader, DEFAULT_CHUNK_SIZE), worker, config)
    }
}

impl<S, W> LineWorker<S, W>
where
    S: ByteSource,
    W: Worker<Line>,
{
    /// Creates an orchestrator bound to `source` and `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(source: S, worker: W, config: LineWorkerConfig) -> Result<Self> {
        config.validate()?;
        let queue = TaskQueue::new(worker, config.concurrency_limit()?);
        let lines = LineBuffer::with_max_lines(source, config.max_lines);

        Ok(Self {
            lines,
            queue,
            config,
            shutdown: CancellationToken::new(),
            interrupted: false,
            skipped: 0,
        })
    }

    /// Stops the run when `token` is cancelled.
    ///
    /// Cancellation stops line pulling and drops tasks that have not started;
    /// running tasks finish before the run completes with
    /// [`Error::Interrupted`].
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub const fn config(&self) -> &LineWorkerConfig {
        &self.config
    }

    pub const fn lines(&self) -> &LineBuffer<S> {
        &self.lines
    }

    pub const fn queue(&self) -> &TaskQueue<Line, W> {
        &self.queue
    }

    #[cfg(test)]
    pub(crate) const fn lines_mut(&mut self) -> &mut LineBuffer<S> {
        &mut self.lines
    }

    /// Returns `true` if a line may be pulled and the queue has room for it.
    pub fn can_accept_more(&self) -> bool {
        self.lines.is_readable() && self.queue.pending_len() < self.config.max_queue_size
    }

    /// Returns `true` once the source is exhausted (or the line cap reached)
    /// and the queue holds no pending or running task.
    pub fn is_drained(&self) -> bool {
        self.lines.is_finished() && self.queue.pending_len() == 0 && self.queue.running() == 0
    }

    /// Moves lines into the queue until the buffer runs dry or the pending
    /// depth reaches `max_queue_size`. Returns the number of tasks pushed.
    ///
    /// Room is re-checked after every push, so the ceiling holds when this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SafetyLimitExceeded`] if `safety` is set and this pass
    /// iterated more than `safety` times.
    pub fn fill_queue(&mut self) -> Result<usize> {
        if self.interrupted {
            return Ok(0);
        }

        let mut pushed = 0;
        let mut iterations = 0_usize;

        while self.can_accept_more() {
            if let Some(limit) = self.config.safety {
                iterations += 1;
                if iterations > limit {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Hitting safety limit of {limit} iterations; aborting");
                    return Err(Error::SafetyLimitExceeded { limit });
                }
            }

            let Some(line) = self.lines.pull_line() else {
                break;
            };
            if line.is_empty() && self.config.skip_empty_lines {
                self.skipped += 1;
                continue;
            }

            #[cfg(feature = "tracing")]
            tracing::trace!("Enqueuing line {}", line.number());
            self.queue.push(line);
            pushed += 1;
        }

        Ok(pushed)
    }

    /// Snapshot of the run's counters.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            lines_read: self.lines.lines_consumed(),
            lines_skipped: self.skipped,
            tasks_dispatched: self.queue.dispatched(),
            tasks_completed: self.queue.completed(),
            tasks_failed: self.queue.failed(),
        }
    }

    /// Runs the event loop until completion.
    ///
    /// # Errors
    ///
    /// See the module documentation for the conditions that end a run with an
    /// error.
    pub async fn run(mut self) -> Result<RunSummary> {
        let result = self.drive().await;
        self.queue.detach_running();

        #[cfg(feature = "tracing")]
        match &result {
            Ok(summary) => tracing::debug!("Line worker drained: {summary:?}"),
            Err(e) => tracing::warn!("Line worker stopped: {e}"),
        }

        result
    }

    /// Spawns [`LineWorker::run`] on the current Tokio runtime and invokes
    /// `on_complete` exactly once with its result.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start<F>(self, on_complete: F) -> JoinHandle<()>
    where
        S: 'static,
        F: FnOnce(Result<RunSummary>) + Send + 'static,
    {
        let mut completion = Completion::new(on_complete);
        tokio::spawn(async move {
            let result = self.run().await;
            completion.fire(result);
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    async fn drive(&mut self) -> Result<RunSummary> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Starting with concurrency {}, queue depth {}..{}",
            self.config.concurrency,
            self.config.min_queue_size,
            self.config.max_queue_size
        );

        if self.lines.is_readable() {
            self.fill_queue()?;
        }

        loop {
            if self.is_drained() {
                return Ok(self.summary());
            }
            if self.interrupted && self.queue.is_idle() {
                return Err(Error::Interrupted);
            }

            tokio::select! {
                event = self.lines.next_event(), if !self.lines.is_closed() && !self.interrupted => {
                    match event {
                        SourceEvent::Readable | SourceEvent::End => {
                            self.fill_queue()?;
                        }
                        SourceEvent::Error(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!("Source failed: {e}");
                            return Err(Error::Source(e));
                        }
                    }
                }
                event = self.queue.next_event() => {
                    match event {
                        QueueEvent::Empty => {
                            self.fill_queue()?;
                        }
                        // Completion is re-evaluated at the top of the loop.
                        QueueEvent::Drain => {}
                        QueueEvent::Failed(e) => {
                            if self.config.halt_on_worker_error {
                                return Err(Error::Worker(e));
                            }
                            #[cfg(feature = "tracing")]
                            tracing::warn!("Task failed, continuing: {e}");
                        }
                    }
                }
                () = self.shutdown.cancelled(), if !self.interrupted => {
                    self.interrupted = true;
                    let _dropped = self.queue.clear_pending();
                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        "Shutdown requested; dropped {_dropped} queued lines, waiting for {} running",
                        self.queue.running()
                    );
                }
            }
        }
    }
}

impl<S, W> core::fmt::Debug for LineWorker<S, W>
where
    S: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineWorker")
            .field("lines", &self.lines)
            .field("queue", &self.queue)
            .field("config", &self.config)
            .field("interrupted", &self.interrupted)
            .finish_non_exhaustive()
    }
}

/// Single-fire completion callback.
struct Completion<F> {
    callback: Option<F>,
}

impl<F> Completion<F>
where
    F: FnOnce(Result<RunSummary>),
{
    const fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    fn fire(&mut self, result: Result<RunSummary>) {
        match self.callback.take() {
            Some(callback) => callback(result),
            None => {
                #[cfg(feature = "tracing")]
                tracing::error!("Completion fired twice; dropping {result:?}");
                debug_assert!(false, "completion fired twice");
            }
        }
    }
}
