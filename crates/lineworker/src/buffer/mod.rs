//! Line assembly on top of a [`ByteSource`].
//!
//! [`LineBuffer`] turns arbitrary chunk deliveries into discrete lines. Lines
//! end at `\n` or `\r\n`; a chunk boundary may fall anywhere, including
//! between the `\r` and `\n` of a single terminator. The trailing fragment of
//! a chunk is held back as the remainder until more data arrives or the
//! source ends.
//!
//! Pulling never blocks. When nothing is available the buffer reports itself
//! not-readable and the caller waits for [`LineBuffer::next_event`].

#[cfg(test)]
mod tests;

use crate::{ByteSource, Error, Line, LineEnding, Result, SourceEvent};
use bytes::{Bytes, BytesMut};
use core::fmt;
use std::collections::VecDeque;

/// Assembles lines from a [`ByteSource`].
#[derive(Debug)]
pub struct LineBuffer<S> {
    source: S,
    remainder: BytesMut,
    pending: VecDeque<(Bytes, LineEnding)>,
    lines_consumed: u64,
    max_lines: Option<u64>,
    readable: bool,
    closed: bool,
}

impl<S> LineBuffer<S>
where
    S: ByteSource,
{
    pub fn new(source: S) -> Self {
        Self::with_max_lines(source, None)
    }

    /// Creates a buffer that stops producing lines once `max_lines` have been
    /// pulled, regardless of remaining source data.
    pub fn with_max_lines(source: S, max_lines: Option<u64>) -> Self {
        Self {
            source,
            remainder: BytesMut::new(),
            pending: VecDeque::new(),
            lines_consumed: 0,
            max_lines,
            readable: false,
            closed: false,
        }
    }

    /// Returns the next assembled line, or `None` if no complete line is
    /// available right now.
    ///
    /// `None` marks the buffer not-readable; wait for the next
    /// [`SourceEvent::Readable`] or [`SourceEvent::End`] before pulling again.
    /// Once the line cap is reached this always returns `None`.
    pub fn pull_line(&mut self) -> Option<Line> {
        if self.cap_reached() {
            self.readable = false;
            return None;
        }

        while self.pending.is_empty() {
            if !self.pull_chunk() {
                self.readable = false;
                return None;
            }
        }

        let (content, ending) = self.pending.pop_front()?;
        self.lines_consumed += 1;
        Some(Line::new(self.lines_consumed, content, ending))
    }

    /// Pulls up to `n` lines, stopping early when none is available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `n` is negative. The buffer is
    /// left untouched in that case.
    pub fn pull_up_to<N>(&mut self, n: N) -> Result<Vec<Line>>
    where
        N: TryInto<usize> + fmt::Display + Copy,
    {
        let count: usize = n.try_into().map_err(|_| Error::InvalidArgument {
            reason: format!("line count must not be negative (got {n})"),
        })?;

        let mut lines = Vec::with_capacity(count.min(self.pending.len().max(1)));
        while lines.len() < count {
            match self.pull_line() {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines)
    }

    /// Returns `true` once the source has ended and every byte has been
    /// returned as a line, or once the line cap has been reached.
    pub fn is_finished(&self) -> bool {
        self.cap_reached()
            || (self.source.is_ended() && self.pending.is_empty() && self.remainder.is_empty())
    }

    /// Returns `true` if a pull may currently produce a line.
    pub const fn is_readable(&self) -> bool {
        self.readable
    }

    /// Returns `true` once the source has announced its end or a failure.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub const fn lines_consumed(&self) -> u64 {
        self.lines_consumed
    }

    pub const fn max_lines(&self) -> Option<u64> {
        self.max_lines
    }

    /// Length of the unterminated fragment currently held back.
    pub fn remainder_len(&self) -> usize {
        self.remainder.len()
    }

    /// Waits for the next source notification and updates readiness.
    ///
    /// [`SourceEvent::Readable`] and [`SourceEvent::End`] mark the buffer
    /// readable (unless the line cap has been reached); `End` does so because
    /// a held remainder becomes the final line. Errors are forwarded as-is.
    ///
    /// This future is cancel-safe.
    pub async fn next_event(&mut self) -> SourceEvent {
        let event = self.source.next_event().await;
        match &event {
            SourceEvent::Readable => self.readable = !self.cap_reached(),
            SourceEvent::End => {
                self.readable = !self.cap_reached();
                self.closed = true;
            }
            SourceEvent::Error(_) => {
                self.readable = false;
                self.closed = true;
            }
        }
        event
    }

    fn cap_reached(&self) -> bool {
        self.max_lines
            .is_some_and(|max_lines| self.lines_consumed >= max_lines)
    }

    /// Moves the next chunk (or the final remainder) into `pending`. Returns
    /// `false` if nothing is available.
    fn pull_chunk(&mut self) -> bool {
        match self.source.read() {
            Some(chunk) => {
                self.split_chunk(chunk);
                true
            }
            None if self.source.is_ended() && !self.remainder.is_empty() => {
                let last = self.remainder.split().freeze();
                self.pending.push_back((last, LineEnding::None));
                true
            }
            None => false,
        }
    }

    fn split_chunk(&mut self, chunk: Bytes) {
        let Some(first) = chunk.iter().position(|&b| b == b'\n') else {
            self.remainder.extend_from_slice(&chunk);
            if self.source.is_ended() {
                let last = self.remainder.split().freeze();
                self.pending.push_back((last, LineEnding::None));
            }
            return;
        };

        // The first terminator closes the held fragment; only the new chunk is
        // scanned, so a line spread over many chunks is copied once.
        let mut start = 0;
        if !self.remainder.is_empty() {
            self.remainder.extend_from_slice(&chunk[..first]);
            let mut head = self.remainder.split();
            let ending = if head.last() == Some(&b'\r') {
                head.truncate(head.len() - 1);
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            };
            self.pending.push_back((head.freeze(), ending));
            start = first + 1;
        }

        while let Some(offset) = chunk[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let (stop, ending) = if end > start && chunk[end - 1] == b'\r' {
                (end - 1, LineEnding::CrLf)
            } else {
                (end, LineEnding::Lf)
            };
            self.pending.push_back((chunk.slice(start..stop), ending));
            start = end + 1;
        }

        if start < chunk.len() {
            if self.source.is_ended() {
                // Nothing can follow, so the fragment is a complete line.
                self.pending
                    .push_back((chunk.slice(start..), LineEnding::None));
            } else {
                self.remainder.extend_from_slice(&chunk[start..]);
            }
        }
    }
}
