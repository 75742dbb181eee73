use super::{ByteSource, SourceEvent};
use crate::{Error, Result};
use bytes::Bytes;
use std::{io, sync::Arc};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Default number of chunks buffered between a [`SourceSender`] and its
/// [`ChunkSource`].
pub const DEFAULT_SOURCE_CAPACITY: usize = 16;

#[derive(Debug)]
enum Frame {
    Chunk(Bytes),
    End,
    Error(Arc<io::Error>),
}

/// Creates a bounded chunk channel.
///
/// The [`SourceSender`] half produces chunks; the [`ChunkSource`] half
/// implements [`ByteSource`] and is handed to a [`crate::LineBuffer`]. A full
/// channel makes [`SourceSender::send`] wait, which is how a slow consumer
/// pushes back on the producer.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn chunk_channel(capacity: usize) -> (SourceSender, ChunkSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        SourceSender { tx },
        ChunkSource {
            rx,
            peeked: None,
            ended: false,
            end_announced: false,
            failed: false,
        },
    )
}

/// Producing half of a [`chunk_channel`].
///
/// Dropping the sender without calling [`SourceSender::end`] also ends the
/// source once every sent chunk has been read.
#[derive(Debug)]
pub struct SourceSender {
    tx: mpsc::Sender<Frame>,
}

impl SourceSender {
    /// Sends one chunk. Empty chunks are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the [`ChunkSource`] was dropped.
    pub async fn send(&self, chunk: impl Into<Bytes>) -> Result<()> {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.forward(Frame::Chunk(chunk)).await
    }

    /// Signals that no more data will arrive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the [`ChunkSource`] was dropped.
    pub async fn end(self) -> Result<()> {
        self.forward(Frame::End).await
    }

    /// Signals a terminal failure of the underlying producer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the [`ChunkSource`] was dropped.
    pub async fn fail(self, err: io::Error) -> Result<()> {
        self.forward(Frame::Error(Arc::new(err))).await
    }

    /// Returns `true` once the receiving [`ChunkSource`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn forward(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).await.map_err(|e| Error::ChannelError {
            context: format!("Source receiver dropped: {e}"),
        })
    }
}

/// Receiving half of a [`chunk_channel`].
///
/// At most one chunk is announced at a time: after [`SourceEvent::Readable`]
/// no further readiness is reported until that chunk has been taken with
/// [`ByteSource::read`]. A consumer that stops reading therefore stops
/// draining the channel, and the producer blocks on its bounded send.
#[derive(Debug)]
pub struct ChunkSource {
    rx: mpsc::Receiver<Frame>,
    peeked: Option<Frame>,
    ended: bool,
    end_announced: bool,
    failed: bool,
}

impl ByteSource for ChunkSource {
    fn read(&mut self) -> Option<Bytes> {
        if self.ended || self.failed {
            return None;
        }

        let frame = match self.peeked.take() {
            Some(frame) => frame,
            None => match self.rx.try_recv() {
                Ok(frame) => frame,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.ended = true;
                    return None;
                }
            },
        };

        match frame {
            Frame::Chunk(chunk) => Some(chunk),
            Frame::End => {
                self.ended = true;
                None
            }
            // Keep the error for `next_event` to report.
            error @ Frame::Error(_) => {
                self.peeked = Some(error);
                None
            }
        }
    }

    fn is_ended(&self) -> bool {
        self.ended
    }

    async fn next_event(&mut self) -> SourceEvent {
        loop {
            match self.peeked.take() {
                Some(Frame::Error(err)) => {
                    self.failed = true;
                    return SourceEvent::Error(err);
                }
                Some(frame) => {
                    // Already announced and not yet read.
                    self.peeked = Some(frame);
                    return core::future::pending().await;
                }
                None => {}
            }

            if self.failed {
                return core::future::pending().await;
            }

            if self.ended {
                if self.end_announced {
                    return core::future::pending().await;
                }
                self.end_announced = true;
                return SourceEvent::End;
            }

            match self.rx.recv().await {
                Some(Frame::Chunk(chunk)) => {
                    self.peeked = Some(Frame::Chunk(chunk));
                    return SourceEvent::Readable;
                }
                Some(Frame::End) | None => self.ended = true,
                Some(Frame::Error(err)) => {
                    self.failed = true;
                    return SourceEvent::Error(err);
                }
            }
        }
    }
}
