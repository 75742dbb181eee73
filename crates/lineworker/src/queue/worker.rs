use crate::BoxError;
use core::future::Future;

/// The unit of work executed for each task pushed onto a
/// [`crate::TaskQueue`].
///
/// Any `Fn(T) -> impl Future<Output = Result<(), E>>` closure is a worker, as
/// long as `E` converts into a [`BoxError`]. Implement the trait directly for
/// workers that carry state.
///
/// # Example
///
/// ```
/// use lineworker::{Line, Worker};
///
/// fn assert_worker<W: Worker<Line>>(_: W) {}
///
/// assert_worker(|line: Line| async move {
///     println!("{line}");
///     Ok::<_, std::io::Error>(())
/// });
/// ```
pub trait Worker<T>: Send + Sync + 'static {
    /// Processes one task. Returning an error marks the task as failed.
    fn process(&self, task: T) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<T, F, Fut, E> Worker<T> for F
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<BoxError>,
{
    fn process(&self, task: T) -> impl Future<Output = Result<(), BoxError>> + Send {
        let fut = self(task);
        async move { fut.await.map_err(Into::into) }
    }
}
