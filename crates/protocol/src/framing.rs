//! EPP-over-TCP framing (RFC 5734)
//!
//! Wire format (big-endian):
//! ```text
//! ┌──────────────┬──────┬───────────┐
//! │ total_length │ u32  │  4 bytes  │  header + payload
//! ├──────────────┼──────┼───────────┤
//! │ payload      │ [u8] │  N bytes  │  one XML document
//! └──────────────┴──────┴───────────┘
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Size of the frame header in bytes
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default upper bound for a single frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Prefixes `payload` with its RFC 5734 length header
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let total = FRAME_HEADER_SIZE + payload.len();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32(total as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Incremental frame decoder
///
/// Feed bytes into a [`BytesMut`] as they arrive and call
/// [`FrameDecoder::decode`] until it returns `Ok(None)`.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    #[inline]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Takes one complete frame payload off the front of `buf`
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let total = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if (total as usize) < FRAME_HEADER_SIZE {
            return Err(FrameError::InvalidLength(total));
        }
        if total as usize > self.max_frame_size {
            return Err(FrameError::TooLarge {
                size: total as usize,
                max: self.max_frame_size,
            });
        }

        let total = total as usize;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        Ok(Some(buf.split_to(total - FRAME_HEADER_SIZE).freeze()))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}
