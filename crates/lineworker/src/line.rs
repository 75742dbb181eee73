use bytes::Bytes;
use core::{fmt, str::Utf8Error};
use std::borrow::Cow;

/// The terminator that ended a [`Line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    /// A bare line feed (`\n`).
    Lf,
    /// A carriage return immediately followed by a line feed (`\r\n`).
    CrLf,
    /// No terminator: the final fragment of a stream that did not end with
    /// one.
    None,
}

impl LineEnding {
    /// Returns the terminator bytes as they appeared in the source.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::None => b"",
        }
    }
}

/// A single line assembled by a [`crate::LineBuffer`].
///
/// The content never includes its terminator. Lines are numbered from 1 in
/// the order they were pulled from the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    number: u64,
    content: Bytes,
    ending: LineEnding,
}

impl Line {
    pub(crate) fn new(number: u64, content: Bytes, ending: LineEnding) -> Self {
        Self {
            number,
            content,
            ending,
        }
    }

    /// 1-based position of this line in the stream.
    pub const fn number(&self) -> u64 {
        self.number
    }

    pub const fn ending(&self) -> LineEnding {
        self.ending
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns the content as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid UTF-8.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        core::str::from_utf8(&self.content)
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    pub fn into_bytes(self) -> Bytes {
        self.content
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
