//! Bounded concurrent execution of tasks.
//!
//! [`TaskQueue`] owns a [`Worker`] and runs it on pushed tasks with a fixed
//! concurrency ceiling, reporting `Empty`, `Drain` and `Failed` through
//! [`QueueEvent`]s.

mod task_queue;
mod worker;

pub use task_queue::*;
pub use worker::*;
