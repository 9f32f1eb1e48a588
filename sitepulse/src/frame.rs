//! Binary host-stats frame codec.
//!
//! One WebSocket binary message carries exactly one frame:
//!
//! | offset | width | field                    |
//! |--------|-------|--------------------------|
//! | 0      | 4     | cpu percent (`f32`)      |
//! | 4      | 8     | total memory bytes (`u64`) |
//! | 12     | 8     | free memory bytes (`u64`)  |
//!
//! All fields are big-endian. No range checks happen here: a cpu value above
//! 100 or `free > total` decodes fine and is left for the display layer.

use bytes::{Buf, BufMut};

use crate::error::DecodeError;

/// Exact wire size of a frame.
pub const FRAME_LEN: usize = 20;

/// A frame as it came off the wire, before the client stamps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub cpu_percent: f32,
    pub mem_total_bytes: u64,
    pub mem_free_bytes: u64,
}

/// Decode one frame. Any length other than [`FRAME_LEN`] is rejected whole.
pub fn decode(frame: &[u8]) -> Result<RawSample, DecodeError> {
    if frame.len() != FRAME_LEN {
        return Err(DecodeError::WrongLength {
            expected: FRAME_LEN,
            actual: frame.len(),
        });
    }
    let mut buf = frame;
    Ok(RawSample {
        cpu_percent: buf.get_f32(),
        mem_total_bytes: buf.get_u64(),
        mem_free_bytes: buf.get_u64(),
    })
}

impl RawSample {
    /// Encode into the wire layout. Used by test servers.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        let mut w = &mut out[..];
        w.put_f32(self.cpu_percent);
        w.put_u64(self.mem_total_bytes);
        w.put_u64(self.mem_free_bytes);
        out
    }
}
