//! Codec parameter tables and the T-STD parameters derived from them.
//!
//! The tables are immutable statics. Validation is done up front so that a
//! rejected setup never touches stream state.

pub mod h264;
pub mod mpeg2;
pub mod smpte302m;

use h264::{H264LevelLimits, H264Profile};
use mpeg2::{Mpeg2Level, Mpeg2LevelLimits, Mpeg2Profile};

/// Transport buffer size in bits (512 bytes).
pub const TB_SIZE: u64 = 4096;
/// Leak rate used for non-video streams that were never configured.
pub const DEFAULT_RX: f64 = 2_000_000.0;
/// Main buffer size for non-video streams that were never configured, in bits.
pub const DEFAULT_AUDIO_BS: u64 = 3584 * 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoParams {
    Mpeg2 {
        level: Mpeg2Level,
        profile: Mpeg2Profile,
    },
    H264 {
        level_idc: u8,
        profile: H264Profile,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MpegVideoContext {
    pub params: VideoParams,
    /// VBV/CPB size expressed in seconds at the peak rate
    pub buffer_size: f64,
    pub frame_rate_code: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpcmContext {
    pub bits_per_sample: u32,
    pub num_channels: u32,
}

/// Codec specific state of a stream. The kind is fixed by the first setup call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CodecContext {
    #[default]
    None,
    MpegVideo(MpegVideoContext),
    Lpcm(LpcmContext),
}

impl CodecContext {
    pub fn is_none(&self) -> bool {
        matches!(self, CodecContext::None)
    }

    pub fn video(&self) -> Option<&MpegVideoContext> {
        match self {
            CodecContext::MpegVideo(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn lpcm(&self) -> Option<&LpcmContext> {
        match self {
            CodecContext::Lpcm(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// T-STD parameters of one elementary stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamTiming {
    /// Leak rate out of the transport buffer, bits/s
    pub rx: f64,
    /// Peak rate out of the multiplex buffer, bits/s
    pub rbx: f64,
    pub tb_size: u64,
    pub mb_size: u64,
    pub eb_size: u64,
}

impl StreamTiming {
    /// MPEG-2 video. Low and Main levels fold the unused VBV headroom into
    /// the multiplex buffer; higher levels cap the peak rate instead.
    pub fn mpeg2(limits: &Mpeg2LevelLimits, vbv_maxrate: u64, vbv_bufsize: u64) -> Self {
        let bitrate = limits.bitrate as f64;
        // 0.004 * bitrate and bitrate / 750, truncated
        let bs_mux = limits.bitrate * 4 / 1000;
        let bs_oh = limits.bitrate / 750;

        let (mb_size, rbx) = match limits.level {
            Mpeg2Level::Low | Mpeg2Level::Main => (
                (bs_mux + bs_oh + limits.vbv).saturating_sub(vbv_bufsize),
                bitrate,
            ),
            _ => (bs_mux + bs_oh, (1.05 * vbv_maxrate as f64).min(bitrate)),
        };

        StreamTiming {
            rx: 1.2 * bitrate,
            rbx,
            tb_size: TB_SIZE,
            mb_size,
            eb_size: vbv_bufsize,
        }
    }

    /// H.264 video, using the NAL HRD factor of 1200 and a 2 Mb/s floor for
    /// the multiplex overhead.
    pub fn h264(limits: &H264LevelLimits) -> Self {
        let rate = 1200 * limits.bitrate;
        let scaled = rate.max(2_000_000);
        let bs_mux = scaled * 4 / 1000;
        let bs_oh = scaled / 750;

        StreamTiming {
            rx: rate as f64,
            rbx: rate as f64,
            tb_size: TB_SIZE,
            mb_size: bs_mux + bs_oh,
            eb_size: 1200 * limits.cpb,
        }
    }

    /// Streams without codec specific setup.
    pub fn generic() -> Self {
        StreamTiming {
            rx: DEFAULT_RX,
            rbx: DEFAULT_RX,
            tb_size: TB_SIZE,
            mb_size: 0,
            eb_size: DEFAULT_AUDIO_BS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mpeg2_main_level_timing() {
        let limits = mpeg2::lookup(Mpeg2Level::Main, Mpeg2Profile::Main).unwrap();
        let t = StreamTiming::mpeg2(limits, 15_000_000, 1_835_008);
        assert_eq!(t.eb_size, 1_835_008);
        assert_eq!(t.rbx, 15_000_000.0);
        assert_eq!(t.mb_size, 60_000 + 20_000);
        assert_eq!(t.tb_size, TB_SIZE);
        assert!((t.rx - 18_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_mpeg2_high_level_caps_peak_rate() {
        let limits = mpeg2::lookup(Mpeg2Level::High, Mpeg2Profile::Main).unwrap();
        let t = StreamTiming::mpeg2(limits, 20_000_000, 9_781_248);
        assert!((t.rbx - 21_000_000.0).abs() < 1e-3);
        assert_eq!(t.mb_size, 320_000 + 106_666);

        let t = StreamTiming::mpeg2(limits, 90_000_000, 9_781_248);
        assert_eq!(t.rbx, 80_000_000.0);
    }

    #[test]
    fn test_h264_timing_floor() {
        // Level 1.0: 1200 * 64 kbit/s is below the 2 Mb/s floor
        let t = StreamTiming::h264(h264::lookup(10).unwrap());
        assert_eq!(t.rx, 76_800.0);
        assert_eq!(t.mb_size, 8_000 + 2_666);
        assert_eq!(t.eb_size, 1200 * 175);

        let t = StreamTiming::h264(h264::lookup(41).unwrap());
        assert_eq!(t.rx, 60_000_000.0);
        assert_eq!(t.mb_size, 240_000 + 80_000);
    }
}
