//! PMT descriptors written by the muxer itself.
//!
//! Each builder returns a [`Descriptor`] whose body is already encoded, so the
//! PMT encoder treats them exactly like caller supplied descriptors.

use super::types::{Descriptor, TsType};
use crate::codec::h264::H264Profile;
use crate::codec::mpeg2::{self, Mpeg2Profile};
use crate::codec::{MpegVideoContext, VideoParams};
use crate::error::Result;
use crate::utils::BitWriter;

pub const VIDEO_STREAM_DESCRIPTOR_TAG: u8 = 0x02;
pub const REGISTRATION_DESCRIPTOR_TAG: u8 = 0x05;
pub const DATA_STREAM_ALIGNMENT_DESCRIPTOR_TAG: u8 = 0x06;
pub const ISO_639_LANGUAGE_DESCRIPTOR_TAG: u8 = 0x0a;
pub const SMOOTHING_BUFFER_DESCRIPTOR_TAG: u8 = 0x10;
pub const AVC_DESCRIPTOR_TAG: u8 = 0x28;
pub const DVB_AC3_DESCRIPTOR_TAG: u8 = 0x6a;
pub const DVB_EAC3_DESCRIPTOR_TAG: u8 = 0x7a;
pub const HDMV_AC3_DESCRIPTOR_TAG: u8 = 0x81;

/// Format identifier of Blu-ray programs.
pub const HDMV_FORMAT_ID: [u8; 4] = *b"HDMV";
/// Format identifier of SMPTE 302M audio.
pub const SMPTE_302M_FORMAT_ID: [u8; 4] = *b"BSSD";

/// Smoothing buffer parameters of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingBuffer {
    /// sb_leak_rate in units of 400 bits/s
    pub leak_rate: u32,
    /// sb_size in bytes
    pub size: u32,
}

pub fn registration(format_id: [u8; 4]) -> Descriptor {
    Descriptor::new(REGISTRATION_DESCRIPTOR_TAG, format_id.to_vec())
}

pub fn smoothing_buffer(sb: &SmoothingBuffer) -> Result<Descriptor> {
    let mut w = BitWriter::with_capacity(6);
    w.write_bits(2, 0x3)?; // reserved
    w.write_bits(22, sb.leak_rate & 0x3f_ffff)?; // sb_leak_rate
    w.write_bits(2, 0x3)?; // reserved
    w.write_bits(22, sb.size & 0x3f_ffff)?; // sb_size
    Ok(Descriptor::new(SMOOTHING_BUFFER_DESCRIPTOR_TAG, w.into_bytes().to_vec()))
}

/// MPEG-2 video_stream_descriptor. `None` for H.264 contexts.
pub fn video_stream(ctx: &MpegVideoContext) -> Result<Option<Descriptor>> {
    let VideoParams::Mpeg2 { level, profile } = ctx.params else {
        return Ok(None);
    };
    // 4:2:2 profile streams are 4:2:2, everything else here is 4:2:0
    let chroma_format = if profile == Mpeg2Profile::Profile422 { 2 } else { 1 };

    let mut w = BitWriter::with_capacity(3);
    w.write_bit(false)?; // multiple_frame_rate_flag
    w.write_bits(4, ctx.frame_rate_code as u32)?; // frame_rate_code
    w.write_bit(false)?; // MPEG_1_only_flag
    w.write_bit(false)?; // constrained_parameter_flag
    w.write_bit(false)?; // still_picture_flag
    w.write_bits(8, mpeg2::profile_and_level_indication(level, profile) as u32)?;
    w.write_bits(2, chroma_format)?; // chroma_format
    w.write_bit(false)?; // frame_rate_extension_flag
    w.write_bits(5, 0x1f)?; // reserved
    Ok(Some(Descriptor::new(
        VIDEO_STREAM_DESCRIPTOR_TAG,
        w.into_bytes().to_vec(),
    )))
}

/// AVC_video_descriptor. `None` for MPEG-2 contexts.
pub fn avc(ctx: &MpegVideoContext) -> Result<Option<Descriptor>> {
    let VideoParams::H264 { level_idc, profile } = ctx.params else {
        return Ok(None);
    };
    let constrained_baseline_or_main = profile <= H264Profile::Main;
    let constraint_set3 = (level_idc == 9 && constrained_baseline_or_main)
        || matches!(
            profile,
            H264Profile::High10Intra | H264Profile::Cavlc444Intra | H264Profile::High444Intra
        );
    // Level 1b is signalled as level_idc 11 with constraint_set3
    let wire_level = if level_idc == 9 { 11 } else { level_idc };

    let mut w = BitWriter::with_capacity(4);
    w.write_bits(8, profile.profile_idc() as u32)?; // profile_idc
    w.write_bit(profile == H264Profile::Baseline)?; // constraint_set0_flag
    w.write_bit(constrained_baseline_or_main)?; // constraint_set1_flag
    w.write_bit(false)?; // constraint_set2_flag
    w.write_bit(constraint_set3)?; // constraint_set3_flag
    w.write_bit(false)?; // constraint_set4_flag
    w.write_bit(false)?; // constraint_set5_flag
    w.write_bits(2, 0)?; // AVC_compatible_flags
    w.write_bits(8, wire_level as u32)?; // level_idc
    w.write_bit(false)?; // AVC_still_present
    w.write_bit(false)?; // AVC_24_hour_picture_flag
    w.write_bits(6, 0x3f)?; // reserved
    Ok(Some(Descriptor::new(AVC_DESCRIPTOR_TAG, w.into_bytes().to_vec())))
}

pub fn data_stream_alignment() -> Descriptor {
    // alignment_type 1: slice or access unit
    Descriptor::new(DATA_STREAM_ALIGNMENT_DESCRIPTOR_TAG, vec![0x01])
}

/// AC-3 or E-AC-3 descriptor. Only DVB and Blu-ray define one this muxer writes.
pub fn ac3(ts_type: TsType, e_ac3: bool) -> Option<Descriptor> {
    let tag = match ts_type {
        TsType::BluRay => HDMV_AC3_DESCRIPTOR_TAG,
        TsType::Dvb if e_ac3 => DVB_EAC3_DESCRIPTOR_TAG,
        TsType::Dvb => DVB_AC3_DESCRIPTOR_TAG,
        _ => return None,
    };
    // component_type, bsid, mainid, asvc and the E-AC-3 substream flags all clear
    Some(Descriptor::new(tag, vec![0x00]))
}

pub fn iso_639_language(lang: [u8; 3]) -> Descriptor {
    let mut data = lang.to_vec();
    data.push(0); // audio_type: undefined
    Descriptor::new(ISO_639_LANGUAGE_DESCRIPTOR_TAG, data)
}
