//! H.264 (ITU-T H.264 Annex A) level limits and profiles.

use crate::error::{MuxError, Result};

/// H.264 profiles, numbered in the order the setup API accepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum H264Profile {
    Baseline,
    Main,
    Extended,
    High,
    High10,
    High422,
    High444Predictive,
    High10Intra,
    High422Intra,
    High444Intra,
    Cavlc444Intra,
}

impl TryFrom<i32> for H264Profile {
    type Error = MuxError;

    fn try_from(profile: i32) -> Result<Self> {
        use H264Profile::*;
        const ALL: [H264Profile; 11] = [
            Baseline,
            Main,
            Extended,
            High,
            High10,
            High422,
            High444Predictive,
            High10Intra,
            High422Intra,
            High444Intra,
            Cavlc444Intra,
        ];
        usize::try_from(profile)
            .ok()
            .and_then(|i| ALL.get(i).copied())
            .ok_or(MuxError::InvalidProfile {
                format: "H.264",
                profile,
            })
    }
}

impl H264Profile {
    /// `profile_idc` as carried in the SPS and the AVC descriptor.
    pub fn profile_idc(self) -> u8 {
        match self {
            H264Profile::Baseline => 66,
            H264Profile::Main => 77,
            H264Profile::Extended => 88,
            H264Profile::High => 100,
            H264Profile::High10 | H264Profile::High10Intra => 110,
            H264Profile::High422 | H264Profile::High422Intra => 122,
            H264Profile::High444Predictive | H264Profile::High444Intra => 244,
            H264Profile::Cavlc444Intra => 44,
        }
    }

    pub fn is_intra(self) -> bool {
        matches!(
            self,
            H264Profile::High10Intra | H264Profile::High422Intra | H264Profile::High444Intra | H264Profile::Cavlc444Intra
        )
    }
}

/// Limits of one `level_idc` from Table A-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H264LevelLimits {
    pub level_idc: u8,
    /// MaxBR in units of 1000 bits/s (scaled by cpbBrNalFactor by callers)
    pub bitrate: u64,
    /// MaxCPB in units of 1000 bits
    pub cpb: u64,
}

const fn level(level_idc: u8, bitrate: u64, cpb: u64) -> H264LevelLimits {
    H264LevelLimits {
        level_idc,
        bitrate,
        cpb,
    }
}

// level_idc 9 stands for level 1b
pub static H264_LEVELS: &[H264LevelLimits] = &[
    level(10, 64, 175),
    level(9, 128, 350),
    level(11, 192, 500),
    level(12, 384, 1_000),
    level(13, 768, 2_000),
    level(20, 2_000, 2_000),
    level(21, 4_000, 4_000),
    level(22, 4_000, 4_000),
    level(30, 10_000, 10_000),
    level(31, 14_000, 14_000),
    level(32, 20_000, 20_000),
    level(40, 20_000, 25_000),
    level(41, 50_000, 62_500),
    level(42, 50_000, 62_500),
    level(50, 135_000, 135_000),
    level(51, 240_000, 240_000),
    level(52, 240_000, 240_000),
];

pub fn lookup(level_idc: i32) -> Option<&'static H264LevelLimits> {
    H264_LEVELS
        .iter()
        .find(|l| i32::from(l.level_idc) == level_idc)
}

/// Validates raw level/profile values: level first, then profile.
pub fn validate(level_idc: i32, profile: i32) -> Result<(&'static H264LevelLimits, H264Profile)> {
    let limits = lookup(level_idc).ok_or(MuxError::InvalidLevel {
        format: "H.264",
        level: level_idc,
    })?;
    let profile = H264Profile::try_from(profile)?;
    Ok((limits, profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_lookup() {
        let l40 = lookup(40).unwrap();
        assert_eq!(l40.bitrate, 20_000);
        assert_eq!(l40.cpb, 25_000);
        assert!(lookup(14).is_none());
        assert_eq!(lookup(9).unwrap().bitrate, 128);
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            validate(33, 0),
            Err(MuxError::InvalidLevel { level: 33, .. })
        ));
        assert!(matches!(
            validate(41, 11),
            Err(MuxError::InvalidProfile { profile: 11, .. })
        ));
        let (_, profile) = validate(41, 3).unwrap();
        assert_eq!(profile, H264Profile::High);
        assert_eq!(profile.profile_idc(), 100);
    }
}
