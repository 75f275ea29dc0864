//! Tokio codec for the newline-delimited device link.
//!
//! [`LineCodec`] plugs the serial byte stream into `FramedRead`/`FramedWrite`:
//!
//! ```text
//! serial rx -> Decoder -> String (one trimmed, non-blank line)
//! DeviceCommand / &str -> Encoder -> serial tx (CRLF terminated)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use airpump_protocol::{DeviceCommand, LineCodec};
//! use futures::{SinkExt, StreamExt};
//! use tokio_util::codec::{FramedRead, FramedWrite};
//!
//! # async fn example<R, W>(rx: R, tx: W) -> airpump_core::Result<()>
//! # where R: tokio::io::AsyncRead + Unpin, W: tokio::io::AsyncWrite + Unpin {
//! let mut lines = FramedRead::new(rx, LineCodec::new());
//! let mut commands = FramedWrite::new(tx, LineCodec::new());
//!
//! commands.send(DeviceCommand::payment(30)).await?;
//! while let Some(line) = lines.next().await {
//!     println!("device: {}", line?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Noise handling
//!
//! A link opened at the wrong baud rate yields garbage without newlines. Lines
//! longer than the configured maximum are rejected with
//! [`Error::LineTooLong`] and the codec then discards input up to the next
//! newline. Invalid UTF-8 is replaced rather than rejected, so noise surfaces
//! as unrecognized lines instead of terminating the stream.

use airpump_core::constants::{DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR};
use airpump_core::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use std::borrow::Cow;
use tokio_util::codec::{Decoder, Encoder};

use crate::DeviceCommand;

/// Append CRLF unless the payload already ends in a newline.
///
/// # Examples
///
/// ```
/// use airpump_protocol::codec::terminate;
///
/// assert_eq!(terminate("PAYMENT:30"), "PAYMENT:30\r\n");
/// assert_eq!(terminate("PAYMENT:30\n"), "PAYMENT:30\n");
/// ```
#[must_use]
pub fn terminate(line: &str) -> Cow<'_, str> {
    if line.ends_with('\n') {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(format!("{line}{LINE_TERMINATOR}"))
    }
}

/// Newline-delimited line codec with a maximum line length.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index into the read buffer already scanned for `\n`.
    next_index: usize,

    /// Maximum raw line length in bytes, carriage return included.
    max_length: usize,

    /// Set after an overlong line until its terminating newline arrives.
    discarding: bool,
}

impl LineCodec {
    /// Codec with the default 1 KiB line limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns `true` while skipping the tail of an overlong line.
    #[must_use]
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the terminator and surrounding whitespace; `None` for blank lines.
fn finish_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let read_to = buf.len().min(self.max_length.saturating_add(1));
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let raw = buf.split_to(end + 1);
                    if let Some(line) = finish_line(&raw[..end]) {
                        return Ok(Some(line));
                    }
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                    let size = buf.len();
                    buf.advance(read_to);
                    self.next_index = 0;
                    return Err(Error::LineTooLong {
                        size,
                        max_size: self.max_length,
                    });
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            buf.clear();
            return Ok(None);
        }
        let raw = buf.split();
        Ok(finish_line(&raw))
    }
}

impl Encoder<&str> for LineCodec {
    type Error = Error;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<()> {
        let body = line.trim_end_matches(['\r', '\n']);
        if body.contains(['\r', '\n']) {
            return Err(Error::InvalidCommand(body.to_string()));
        }
        let framed = terminate(line);
        dst.reserve(framed.len());
        dst.put_slice(framed.as_bytes());
        Ok(())
    }
}

impl Encoder<DeviceCommand> for LineCodec {
    type Error = Error;

    fn encode(&mut self, command: DeviceCommand, dst: &mut BytesMut) -> Result<()> {
        dst.put_slice(command.to_line().as_bytes());
        Ok(())
    }
}
