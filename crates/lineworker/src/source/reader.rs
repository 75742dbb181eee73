use super::{ChunkSource, DEFAULT_SOURCE_CAPACITY, SourceSender, chunk_channel};
use core::pin::pin;
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;

/// Default number of bytes requested from a reader per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

impl ChunkSource {
    /// Spawns a background task that pumps `reader` into a new
    /// [`ChunkSource`], `chunk_size` bytes at a time.
    ///
    /// The pump stops at end of input, on the first read error (which is
    /// forwarded as [`crate::SourceEvent::Error`]), or when the returned
    /// source is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn from_reader<R>(reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let (tx, source) = chunk_channel(DEFAULT_SOURCE_CAPACITY);
        tokio::spawn(pump(reader, chunk_size.max(1), tx));
        source
    }
}

async fn pump<R>(reader: R, chunk_size: usize, tx: SourceSender)
where
    R: AsyncRead + Send + 'static,
{
    let mut chunks = pin!(ReaderStream::with_capacity(reader, chunk_size));

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                if let Err(_e) = tx.send(bytes).await {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Stopping reader pump: {_e}");
                    return;
                }
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Reader failed: {e}");
                if let Err(_e) = tx.fail(e).await {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Failed to forward reader error: {_e}");
                }
                return;
            }
        }
    }

    if let Err(_e) = tx.end().await {
        #[cfg(feature = "tracing")]
        tracing::debug!("Failed to forward end of input: {_e}");
    }
}
