use std::num::ParseIntError;
use thiserror::Error;

/// Errors reported by the multiplexer.
///
/// Setup and configuration errors leave the writer untouched. Runtime
/// anomalies such as a DTS later than its PTS are logged instead.
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid PID: {0:#06x}")]
    InvalidPid(u16),

    #[error("invalid level {level} for {format}")]
    InvalidLevel { format: &'static str, level: i32 },

    #[error("invalid profile {profile} for {format}")]
    InvalidProfile { format: &'static str, profile: i32 },

    #[error("invalid MPEG-2 level/profile combination: level {level}, profile {profile}")]
    InvalidLevelProfile { level: i32, profile: i32 },

    #[error("PID {0:#06x} is not an MPEG-2 or H.264 video stream")]
    NotVideoStream(u16),

    #[error("PID {0:#06x} is not an LPCM-family audio stream")]
    NotLpcmStream(u16),

    #[error("frame rate {0} has no MPEG-2 frame_rate_code")]
    InvalidFrameRate(f64),

    #[error("{0} is not allowed in this transport stream type")]
    DisallowedForProfile(&'static str),

    #[error("invalid SMPTE 302M bit depth: {0}")]
    InvalidBitDepth(u32),

    #[error("invalid SMPTE 302M channel count: {0}")]
    InvalidChannelCount(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("bitstream overflow: {needed} bits requested, {capacity} bytes available")]
    BitstreamOverflow { needed: usize, capacity: usize },

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

pub type Result<T> = std::result::Result<T, MuxError>;
