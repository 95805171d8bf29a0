//! Frame codec and connection hello.
//!
//! Wire format of one record:
//!
//! ```text
//! +----------+---------------------+-------------------------+
//! | priority | length (4 bytes BE) | message (length bytes)  |
//! +----------+---------------------+-------------------------+
//! ```
//!
//! The priority byte and the length are validated before the payload is
//! awaited, so an oversized or garbage frame is rejected without
//! allocating for it. Decoding is resumable: [`FrameDecoder::decode`]
//! returns `Ok(None)` when more bytes are needed, and the caller keeps
//! accumulating into the same buffer.

use crate::record::{MAX_MESSAGE_LEN, Priority, Record};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Priority byte plus the big-endian payload length.
pub const FRAME_HEADER_LEN: usize = 5;

/// Connection preamble: magic, protocol version, client pid, sink hint.
pub const HELLO_LEN: usize = 10;

pub const HELLO_MAGIC: u32 = 0xb05a_cafe;
pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("message length {len} exceeds the {max} byte frame ceiling")]
    MessageTooLarge { len: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown priority byte {0:#04x}")]
    BadPriority(u8),
    #[error("frame length {len} exceeds the {max} byte ceiling")]
    FrameTooLarge { len: usize, max: usize },
    #[error("message is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode one record into a complete frame.
///
/// Refuses oversized messages before writing anything, so a failed
/// encode never leaves a partial frame for the caller to flush.
pub fn encode_record(record: &Record) -> Result<Bytes, EncodeError> {
    encode_frame(record.priority, &record.message)
}

/// Encode a frame without constructing a [`Record`] first.
pub fn encode_frame(priority: Priority, message: &str) -> Result<Bytes, EncodeError> {
    let len = message.len();
    if len > MAX_MESSAGE_LEN {
        return Err(EncodeError::MessageTooLarge {
            len,
            max: MAX_MESSAGE_LEN,
        });
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + len);
    buf.put_u8(priority.as_u8());
    buf.put_u32(len as u32);
    buf.put_slice(message.as_bytes());
    Ok(buf.freeze())
}

/// Resumable frame decoder.
///
/// Stateless apart from the configured ceiling; the caller owns the
/// accumulation buffer and feeds it back in as bytes arrive.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_message_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_LEN)
    }
}

impl FrameDecoder {
    pub fn new(max_message_len: usize) -> Self {
        Self { max_message_len }
    }

    /// Try to decode one frame from the front of `buf`.
    ///
    /// `Ok(None)` means the buffer does not yet hold a complete frame.
    /// Errors are unrecoverable for the stream: the bytes cannot be
    /// resynchronized, so the connection must be closed.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Record>, DecodeError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let priority =
            Priority::from_u8(buf[0]).ok_or(DecodeError::BadPriority(buf[0]))?;
        let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        if len > self.max_message_len {
            return Err(DecodeError::FrameTooLarge {
                len,
                max: self.max_message_len,
            });
        }
        if buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(len);
        let message = std::str::from_utf8(&payload)
            .map_err(|_| DecodeError::InvalidUtf8)?
            .to_owned();
        Ok(Some(Record { priority, message }))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelloError {
    #[error("bad hello magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
}

/// One-shot preamble a client writes immediately after connecting,
/// before its first frame. The daemon validates magic and version and
/// uses the pid for connection identity in its own logs. The sink hint
/// is the legacy sink-type byte; routing is daemon-side configuration,
/// so the daemon only records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub pid: u32,
    pub sink_hint: u8,
}

impl Hello {
    pub fn encode(&self) -> [u8; HELLO_LEN] {
        let mut raw = [0u8; HELLO_LEN];
        raw[0..4].copy_from_slice(&HELLO_MAGIC.to_be_bytes());
        raw[4] = PROTOCOL_VERSION;
        raw[5..9].copy_from_slice(&self.pid.to_be_bytes());
        raw[9] = self.sink_hint;
        raw
    }

    pub fn decode(raw: [u8; HELLO_LEN]) -> Result<Self, HelloError> {
        let magic = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        if magic != HELLO_MAGIC {
            return Err(HelloError::BadMagic(magic));
        }
        if raw[4] != PROTOCOL_VERSION {
            return Err(HelloError::UnsupportedVersion(raw[4]));
        }
        Ok(Hello {
            pid: u32::from_be_bytes([raw[5], raw[6], raw[7], raw[8]]),
            sink_hint: raw[9],
        })
    }
}
