//! SMPTE 302M (AES3 PCM in MPEG-2 TS) constraints.

use crate::error::{MuxError, Result};

/// 302M audio is always carried at 48 kHz.
pub const SMPTE_302M_AUDIO_SR: u64 = 48_000;
/// Main buffer size for 302M audio, in bits.
pub const SMPTE_302M_AUDIO_BS: u64 = 65_024 * 8;

pub const VALID_BIT_DEPTHS: [u32; 3] = [16, 20, 24];

/// Checks bit depth then channel count. Channels come in AES3 pairs, up to 8.
pub fn validate(bit_depth: u32, num_channels: u32) -> Result<()> {
    if !VALID_BIT_DEPTHS.contains(&bit_depth) {
        return Err(MuxError::InvalidBitDepth(bit_depth));
    }
    if num_channels & 1 == 1 || num_channels == 0 || num_channels > 8 {
        return Err(MuxError::InvalidChannelCount(num_channels));
    }
    Ok(())
}

/// Size of one 302M sample frame in bytes for a bit depth.
pub fn frame_bytes(bit_depth: u32) -> u64 {
    u64::from(bit_depth >> 2) + 1
}

/// Nominal T-STD leak rate for a bit depth, in bits per second.
pub fn leak_rate(bit_depth: u32) -> f64 {
    1.2 * (frame_bytes(bit_depth) * SMPTE_302M_AUDIO_SR * 8) as f64
}
