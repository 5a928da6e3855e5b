//! Tokio codec for doorlink protocol lines.
//!
//! `DoorCodec` implements [`Decoder`] and [`Encoder`] for newline-terminated
//! protocol lines. Door modules usually send one line per UDP datagram, but a
//! datagram may carry several lines and the final line may lack its
//! terminator; [`DoorCodec::decode_datagram`] handles both.
//!
//! Lines the parser cannot attribute to a module are skipped rather than
//! reported, so a single garbled line never poisons the rest of a datagram.
//!
//! # Example
//!
//! ```
//! use doorlink_protocol::{DoorCodec, MessageKind};
//!
//! let mut codec = DoorCodec::new();
//! let messages = codec
//!     .decode_datagram(b"D1 HELLO\nnoise\nD1 EVENT D0 DOOR OPEN")
//!     .unwrap();
//!
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0].kind, MessageKind::Hello);
//! ```
//!
//! # DoS Protection
//!
//! Lines longer than the configured maximum (default 256 bytes) are rejected
//! with `Error::LineTooLong` instead of being buffered.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::{Message, MessageParser};
use doorlink_core::constants::{DEFAULT_MAX_LINE_LEN, LINE_TERMINATOR};
use doorlink_core::{Error, Result};

/// Line codec for the doorlink protocol.
#[derive(Debug, Clone)]
pub struct DoorCodec {
    /// Maximum accepted line length in bytes, terminator included.
    max_line_len: usize,
}

impl DoorCodec {
    pub fn new() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Create a codec with a custom line length limit.
    ///
    /// ```
    /// use doorlink_protocol::DoorCodec;
    ///
    /// let codec = DoorCodec::with_max_line_len(1024);
    /// assert_eq!(codec.max_line_len(), 1024);
    /// ```
    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self { max_line_len }
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Decode every usable line of one datagram.
    ///
    /// # Errors
    /// Returns `Error::LineTooLong` if any line exceeds the limit.
    pub fn decode_datagram(&mut self, datagram: &[u8]) -> Result<Vec<Message>> {
        let mut buf = BytesMut::from(datagram);
        let mut messages = Vec::new();
        while let Some(message) = self.decode_eof(&mut buf)? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Encode a message into a standalone datagram payload.
    ///
    /// # Errors
    /// Returns `Error::LineTooLong` if the encoded line exceeds the limit.
    pub fn encode_datagram(&mut self, message: &Message) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        Encoder::<&Message>::encode(self, message, &mut buf)?;
        Ok(buf)
    }

    fn check_len(&self, size: usize) -> Result<()> {
        if size > self.max_line_len {
            return Err(Error::LineTooLong {
                size,
                max_size: self.max_line_len,
            });
        }
        Ok(())
    }

    fn parse_raw_line(raw: &[u8]) -> Option<Message> {
        let Ok(line) = std::str::from_utf8(raw) else {
            trace!("Skipping line with invalid UTF-8");
            return None;
        };

        match MessageParser::parse(line) {
            Ok(message) => Some(message),
            Err(e) => {
                trace!(line = %line.trim_end(), error = %e, "Skipping unusable line");
                None
            }
        }
    }
}

impl Default for DoorCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DoorCodec {
    type Item = Message;
    type Error = Error;

    /// Decode the next usable line from the buffer.
    ///
    /// Returns `Ok(None)` when no complete line remains. Unusable lines are
    /// consumed and skipped.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == LINE_TERMINATOR as u8) else {
                self.check_len(src.len())?;
                return Ok(None);
            };

            self.check_len(pos + 1)?;
            let line = src.split_to(pos + 1);

            if let Some(message) = Self::parse_raw_line(&line) {
                return Ok(Some(message));
            }
        }
    }

    /// Like [`decode`](Self::decode), but treats unterminated trailing bytes
    /// as a final line.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let rest = src.split();
        Ok(Self::parse_raw_line(&rest))
    }
}

impl Encoder<&Message> for DoorCodec {
    type Error = Error;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<()> {
        let line = item.to_string();
        self.check_len(line.len() + 1)?;

        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(LINE_TERMINATOR as u8);
        Ok(())
    }
}

impl Encoder<Message> for DoorCodec {
    type Error = Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&Message>::encode(self, &item, dst)
    }
}
