//! MPEG-2 video (ISO/IEC 13818-2) level and profile limits.

use crate::error::{MuxError, Result};

pub const MPEG2_LEVEL_LOW: i32 = 0;
pub const MPEG2_LEVEL_MAIN: i32 = 1;
pub const MPEG2_LEVEL_HIGH_1440: i32 = 2;
pub const MPEG2_LEVEL_HIGH: i32 = 3;
pub const MPEG2_LEVEL_HIGHP: i32 = 4;

pub const MPEG2_PROFILE_SIMPLE: i32 = 0;
pub const MPEG2_PROFILE_MAIN: i32 = 1;
pub const MPEG2_PROFILE_HIGH: i32 = 2;
pub const MPEG2_PROFILE_422: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mpeg2Level {
    Low,
    Main,
    High1440,
    High,
    HighP,
}

impl TryFrom<i32> for Mpeg2Level {
    type Error = MuxError;

    fn try_from(level: i32) -> Result<Self> {
        match level {
            MPEG2_LEVEL_LOW => Ok(Mpeg2Level::Low),
            MPEG2_LEVEL_MAIN => Ok(Mpeg2Level::Main),
            MPEG2_LEVEL_HIGH_1440 => Ok(Mpeg2Level::High1440),
            MPEG2_LEVEL_HIGH => Ok(Mpeg2Level::High),
            MPEG2_LEVEL_HIGHP => Ok(Mpeg2Level::HighP),
            _ => Err(MuxError::InvalidLevel {
                format: "MPEG-2",
                level,
            }),
        }
    }
}

impl Mpeg2Level {
    fn indication(self) -> u8 {
        match self {
            Mpeg2Level::Low => 0b1010,
            Mpeg2Level::Main => 0b1000,
            Mpeg2Level::High1440 => 0b0110,
            Mpeg2Level::High => 0b0100,
            Mpeg2Level::HighP => 0b0010,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mpeg2Profile {
    Simple,
    Main,
    High,
    Profile422,
}

impl TryFrom<i32> for Mpeg2Profile {
    type Error = MuxError;

    fn try_from(profile: i32) -> Result<Self> {
        match profile {
            MPEG2_PROFILE_SIMPLE => Ok(Mpeg2Profile::Simple),
            MPEG2_PROFILE_MAIN => Ok(Mpeg2Profile::Main),
            MPEG2_PROFILE_HIGH => Ok(Mpeg2Profile::High),
            MPEG2_PROFILE_422 => Ok(Mpeg2Profile::Profile422),
            _ => Err(MuxError::InvalidProfile {
                format: "MPEG-2",
                profile,
            }),
        }
    }
}

/// Upper bounds for one legal profile@level pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpeg2LevelLimits {
    pub level: Mpeg2Level,
    pub profile: Mpeg2Profile,
    /// Maximum bitrate in bits per second
    pub bitrate: u64,
    /// VBV buffer size in bits
    pub vbv: u64,
}

const fn limits(level: Mpeg2Level, profile: Mpeg2Profile, bitrate: u64, vbv: u64) -> Mpeg2LevelLimits {
    Mpeg2LevelLimits {
        level,
        profile,
        bitrate,
        vbv,
    }
}

/// Tables 8-12 to 8-15 of ISO/IEC 13818-2, legal combinations only.
pub static MPEG2_LEVELS: &[Mpeg2LevelLimits] = &[
    limits(Mpeg2Level::Main, Mpeg2Profile::Simple, 15_000_000, 1_835_008),
    limits(Mpeg2Level::Low, Mpeg2Profile::Main, 4_000_000, 475_136),
    limits(Mpeg2Level::Main, Mpeg2Profile::Main, 15_000_000, 1_835_008),
    limits(Mpeg2Level::High1440, Mpeg2Profile::Main, 60_000_000, 7_340_032),
    limits(Mpeg2Level::High, Mpeg2Profile::Main, 80_000_000, 9_781_248),
    limits(Mpeg2Level::HighP, Mpeg2Profile::Main, 80_000_000, 9_781_248),
    limits(Mpeg2Level::Main, Mpeg2Profile::High, 20_000_000, 2_441_216),
    limits(Mpeg2Level::High1440, Mpeg2Profile::High, 80_000_000, 9_781_248),
    limits(Mpeg2Level::High, Mpeg2Profile::High, 100_000_000, 12_222_464),
    limits(Mpeg2Level::HighP, Mpeg2Profile::High, 100_000_000, 12_222_464),
    limits(Mpeg2Level::Main, Mpeg2Profile::Profile422, 50_000_000, 9_437_184),
    limits(Mpeg2Level::High, Mpeg2Profile::Profile422, 300_000_000, 47_185_920),
];

/// Looks up a profile@level pair. `None` means the pair is not legal.
pub fn lookup(level: Mpeg2Level, profile: Mpeg2Profile) -> Option<&'static Mpeg2LevelLimits> {
    MPEG2_LEVELS
        .iter()
        .find(|l| l.level == level && l.profile == profile)
}

/// Validates raw level/profile values in the order the setup API reports them.
pub fn validate(level: i32, profile: i32) -> Result<&'static Mpeg2LevelLimits> {
    let lvl = Mpeg2Level::try_from(level)?;
    let prof = Mpeg2Profile::try_from(profile)?;
    lookup(lvl, prof).ok_or(MuxError::InvalidLevelProfile { level, profile })
}

/// `profile_and_level_indication` for the video stream descriptor.
pub fn profile_and_level_indication(level: Mpeg2Level, profile: Mpeg2Profile) -> u8 {
    let profile_bits = match profile {
        // 4:2:2 uses the escape range
        Mpeg2Profile::Profile422 => {
            return if level == Mpeg2Level::Main { 0x85 } else { 0x82 };
        }
        Mpeg2Profile::High => 0b001,
        Mpeg2Profile::Main => 0b100,
        Mpeg2Profile::Simple => 0b101,
    };
    (profile_bits << 4) | level.indication()
}

/// MPEG-2 `frame_rate_code` for a frame rate, if it has one.
pub fn frame_rate_code(frame_rate: f64) -> Option<u8> {
    const RATES: [(f64, u8); 8] = [
        (24000.0 / 1001.0, 1),
        (24.0, 2),
        (25.0, 3),
        (30000.0 / 1001.0, 4),
        (30.0, 5),
        (50.0, 6),
        (60000.0 / 1001.0, 7),
        (60.0, 8),
    ];
    RATES
        .iter()
        .find(|(rate, _)| (rate - frame_rate).abs() < 0.005)
        .map(|&(_, code)| code)
}
