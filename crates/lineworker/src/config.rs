use crate::{Error, Result};
use core::num::NonZeroUsize;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 20;
pub const DEFAULT_MIN_QUEUE_SIZE: usize = 5;

/// Tuning knobs for a [`crate::LineWorker`] run.
///
/// The defaults (5 concurrent tasks, at most 20 pending) suit workers that
/// spend most of their time waiting on I/O. Use the `with_*` methods to
/// override individual values; [`LineWorkerConfig::validate`] is called when
/// the orchestrator is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWorkerConfig {
    /// Maximum number of tasks running at the same time.
    pub concurrency: usize,
    /// Pending depth at which dispatch pauses.
    pub max_queue_size: usize,
    /// Advisory low-water mark. Reported in logs, never enforced.
    pub min_queue_size: usize,
    /// Hard cap on the number of lines ever pulled from the source.
    pub max_lines: Option<u64>,
    /// Iteration cap for a single fill pass.
    pub safety: Option<usize>,
    /// Drop zero-length lines instead of handing them to the worker.
    pub skip_empty_lines: bool,
    /// Complete the run with the first worker error instead of counting it.
    pub halt_on_worker_error: bool,
}

impl Default for LineWorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            min_queue_size: DEFAULT_MIN_QUEUE_SIZE,
            max_lines: None,
            safety: None,
            skip_empty_lines: false,
            halt_on_worker_error: true,
        }
    }
}

impl LineWorkerConfig {
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub const fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    pub const fn with_min_queue_size(mut self, min_queue_size: usize) -> Self {
        self.min_queue_size = min_queue_size;
        self
    }

    pub const fn with_max_lines(mut self, max_lines: Option<u64>) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub const fn with_safety(mut self, safety: Option<usize>) -> Self {
        self.safety = safety;
        self
    }

    pub const fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    pub const fn with_halt_on_worker_error(mut self, halt: bool) -> Self {
        self.halt_on_worker_error = halt;
        self
    }

    /// Checks the configuration for values the orchestrator cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if:
    /// - `concurrency` is zero.
    /// - `max_queue_size` is zero.
    /// - `min_queue_size` exceeds `max_queue_size`.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig {
                reason: "concurrency must be greater than 0".to_string(),
            });
        }
        if self.max_queue_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_queue_size must be greater than 0".to_string(),
            });
        }
        if self.min_queue_size > self.max_queue_size {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "min_queue_size ({}) exceeds max_queue_size ({})",
                    self.min_queue_size, self.max_queue_size
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn concurrency_limit(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.concurrency).ok_or_else(|| Error::InvalidConfig {
            reason: "concurrency must be greater than 0".to_string(),
        })
    }
}
