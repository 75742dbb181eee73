//! Byte sources feeding a [`crate::LineBuffer`].
//!
//! A source hands out chunks without ever waiting ([`ByteSource::read`]) and
//! announces state changes through [`ByteSource::next_event`]. Waiting for
//! more data is always expressed as awaiting the next event, never as a
//! blocking read.

mod channel;
mod reader;

pub use channel::*;
pub use reader::*;

use bytes::Bytes;
use std::{io, sync::Arc};

/// Notification emitted by a [`ByteSource`].
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// More data may be available to [`ByteSource::read`] now.
    Readable,
    /// No more data will ever arrive.
    End,
    /// The source failed. No more data will arrive.
    Error(Arc<io::Error>),
}

/// A non-blocking producer of byte chunks.
pub trait ByteSource: Send {
    /// Returns the next available chunk, or `None` if nothing is available
    /// right now.
    fn read(&mut self) -> Option<Bytes>;

    /// Returns `true` once no chunk will ever be returned by
    /// [`ByteSource::read`] again.
    fn is_ended(&self) -> bool;

    /// Waits for the next notification.
    ///
    /// After [`SourceEvent::End`] or [`SourceEvent::Error`] has been returned
    /// the future never resolves. The future must be cancel-safe: dropping it
    /// before completion loses no data.
    fn next_event(&mut self) -> impl Future<Output = SourceEvent> + Send;
}
