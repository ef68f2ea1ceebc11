//! Client identifiers
//!
//! An identifier arrives as the raw bytes of a single rendezvous read. It
//! doubles as part of two FIFO file names, so anything that could escape the
//! base directory or confuse a line-oriented client is refused up front.

use std::borrow::Borrow;
use std::fmt;

use crate::error::IdError;

use super::constants::{INBOUND_SUFFIX, OUTBOUND_PREFIX};

/// Identifier of a registered client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Parse an identifier from one rendezvous read
    ///
    /// Trailing `\n`, `\r` and NUL terminators are stripped. Identifiers longer
    /// than `max_len` bytes are rejected rather than truncated.
    pub fn parse(raw: &[u8], max_len: usize) -> Result<Self, IdError> {
        let end = raw
            .iter()
            .rposition(|b| !matches!(b, b'\n' | b'\r' | b'\0'))
            .map_or(0, |pos| pos + 1);
        let trimmed = &raw[..end];

        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        if trimmed.len() > max_len {
            return Err(IdError::TooLong {
                len: trimmed.len(),
                max: max_len,
            });
        }

        let text = std::str::from_utf8(trimmed).map_err(|_| IdError::NotUtf8)?;
        Self::new(text)
    }

    /// Validate an identifier given as text
    ///
    /// Applies the character rules of [`ClientId::parse`] but no length limit.
    pub fn new(text: impl Into<String>) -> Result<Self, IdError> {
        let text = text.into();

        if text.is_empty() {
            return Err(IdError::Empty);
        }
        if text == "." || text == ".." {
            return Err(IdError::Reserved(text));
        }
        if let Some(c) = text
            .chars()
            .find(|c| *c == '/' || c.is_whitespace() || c.is_control())
        {
            return Err(IdError::InvalidChar(c));
        }

        Ok(Self(text))
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the client-to-server FIFO
    pub fn inbound_name(&self) -> String {
        format!("{}{}", self.0, INBOUND_SUFFIX)
    }

    /// File name of the server-to-client FIFO
    pub fn outbound_name(&self) -> String {
        format!("{}{}", OUTBOUND_PREFIX, self.0)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
