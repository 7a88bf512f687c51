//! SBW memory frame codec
//!
//! Wire layout (all integers little-endian), bit-exact with the probe
//! firmware:
//!
//! ```text
//! write request : address (u32) | count (u8) | count x word (u16)
//! read request  : address (u32) | count (u8)
//! read response : count x word (u16), no header
//! ```
//!
//! The vendor request id that precedes every frame on the wire is the
//! transport's business, but it still counts against [`MAX_FRAME_SIZE`].

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::packet::{Packet, MAX_PACKET_WORDS};
use crate::protocol::DAP_PACKET_SIZE;

/// Hard byte ceiling of one command on the transport
pub const MAX_FRAME_SIZE: usize = DAP_PACKET_SIZE;

/// Bytes in front of the words of a write frame (address + count)
pub const WRITE_HEADER_LEN: usize = 5;

/// Length of a read request
pub const READ_REQUEST_LEN: usize = 5;

/// Transport framing byte (vendor request id) preceding every frame
pub const REQUEST_ID_LEN: usize = 1;

/// Fixed per-frame overhead: request id + address + count
pub const FRAME_OVERHEAD: usize = REQUEST_ID_LEN + WRITE_HEADER_LEN;

/// An encoded frame, bounded by [`MAX_FRAME_SIZE`]
pub type Frame = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Largest packet capacity (in words) that still yields legal frames
///
/// Computed as `(max_frame_size - FRAME_OVERHEAD) / 2` and clamped to the
/// one-byte count field. Returns an error if not even one word fits or the
/// frame size exceeds the transport ceiling.
pub fn max_words(max_frame_size: usize) -> Result<usize> {
    if max_frame_size > MAX_FRAME_SIZE || max_frame_size < FRAME_OVERHEAD + 2 {
        return Err(Error::InvalidFrameSize(max_frame_size));
    }
    Ok(((max_frame_size - FRAME_OVERHEAD) / 2).min(MAX_PACKET_WORDS))
}

/// Encode a packet as a write frame
///
/// Fails with [`Error::FrameTooLarge`] if the frame plus the request id
/// would reach `max_frame_size`. That indicates a packet capacity computed
/// too large upstream and is not retried.
pub fn encode_write(packet: &Packet, max_frame_size: usize) -> Result<Frame> {
    let len = WRITE_HEADER_LEN + 2 * packet.len();
    let max = max_frame_size.min(MAX_FRAME_SIZE);
    if len + REQUEST_ID_LEN > max || packet.len() > MAX_PACKET_WORDS {
        return Err(Error::FrameTooLarge { len, max });
    }

    let mut frame = Frame::new();
    // Capacity was checked above, so extending cannot fail
    frame
        .extend_from_slice(&packet.address().to_le_bytes())
        .map_err(|_| Error::FrameTooLarge { len, max })?;
    frame
        .push(packet.len() as u8)
        .map_err(|_| Error::FrameTooLarge { len, max })?;
    for word in packet.words() {
        frame
            .extend_from_slice(&word.to_le_bytes())
            .map_err(|_| Error::FrameTooLarge { len, max })?;
    }
    Ok(frame)
}

/// Encode a read request for `n_words` words at `address`
pub fn encode_read(address: u32, n_words: u8) -> [u8; READ_REQUEST_LEN] {
    let a = address.to_le_bytes();
    [a[0], a[1], a[2], a[3], n_words]
}

/// Decode a read response into `n_words` words
///
/// Extra trailing bytes are ignored; fewer than `2 * n_words` bytes is a
/// [`Error::ShortResponse`].
pub fn decode_read(raw: &[u8], n_words: usize) -> Result<Vec<u16>> {
    let expected = 2 * n_words;
    if raw.len() < expected {
        return Err(Error::ShortResponse {
            expected,
            actual: raw.len(),
        });
    }
    Ok(raw[..expected]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Decode a write frame back into a packet (probe side of the protocol)
pub fn decode_write(frame: &[u8]) -> Result<Packet> {
    if frame.len() < WRITE_HEADER_LEN {
        return Err(Error::ShortResponse {
            expected: WRITE_HEADER_LEN,
            actual: frame.len(),
        });
    }
    let address = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let count = frame[4] as usize;
    let words = decode_read(&frame[WRITE_HEADER_LEN..], count)?;

    let mut packet = Packet::new(address, count.max(1));
    for w in words {
        packet.push(w)?;
    }
    Ok(packet)
}
