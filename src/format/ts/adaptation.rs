use super::types::TS_PAYLOAD_SIZE;
use crate::av::AuInfo;
use crate::error::{MuxError, Result};
use crate::utils::BitWriter;
use bytes::Bytes;

/// data_field_tag of the DVB AU_information structure (ETSI TS 101 154).
pub const AU_INFORMATION_TAG: u8 = 0x02;
pub const AU_CODING_FORMAT_MPEG2: u8 = 0x1;
pub const AU_CODING_FORMAT_H264: u8 = 0x2;

/// Contents of a packet's adaptation field.
///
/// The field is written to an exact size chosen by the packet assembler;
/// whatever the content does not use is filled with 0xFF stuffing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    pub discontinuity: bool,
    pub random_access: bool,
    pub priority: bool,
    /// PCR as (33-bit base, 9-bit extension)
    pub pcr: Option<(u64, u16)>,
    pub private_data: Option<Bytes>,
}

impl AdaptationField {
    pub fn with_pcr(base: u64, extension: u16) -> Self {
        Self {
            pcr: Some((base, extension)),
            ..Default::default()
        }
    }

    /// True if the field carries nothing and is only needed for stuffing.
    pub fn is_empty(&self) -> bool {
        !self.discontinuity
            && !self.random_access
            && !self.priority
            && self.pcr.is_none()
            && self.private_data.is_none()
    }

    /// Smallest encoding including the length byte, 0 if not needed at all.
    pub fn min_len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut len = 2;
        if self.pcr.is_some() {
            len += 6;
        }
        if let Some(data) = &self.private_data {
            len += 1 + data.len();
        }
        len
    }

    /// Writes the field in exactly `total_len` bytes, length byte included.
    ///
    /// A one byte field is just `adaptation_field_length = 0`, which is only
    /// legal when there is nothing to carry.
    pub fn write_to(&self, w: &mut BitWriter, total_len: usize) -> Result<()> {
        if total_len == 0 || total_len > TS_PAYLOAD_SIZE || total_len < self.min_len() {
            return Err(MuxError::InvalidData(format!(
                "adaptation field of {} bytes cannot hold {} bytes of content",
                total_len,
                self.min_len()
            )));
        }

        let start = w.pos();
        w.write_bits(8, 0)?; // adaptation_field_length, patched below
        if total_len == 1 {
            return Ok(());
        }

        let mut q = BitWriter::with_capacity(TS_PAYLOAD_SIZE);
        q.write_bit(self.discontinuity)?; // discontinuity_indicator
        q.write_bit(self.random_access)?; // random_access_indicator
        q.write_bit(self.priority)?; // elementary_stream_priority_indicator
        q.write_bit(self.pcr.is_some())?; // PCR_flag
        q.write_bit(false)?; // OPCR_flag
        q.write_bit(false)?; // splicing_point_flag
        q.write_bit(self.private_data.is_some())?; // transport_private_data_flag
        q.write_bit(false)?; // adaptation_field_extension_flag

        if let Some((base, extension)) = self.pcr {
            q.write_bits(32, (base >> 1) as u32)?; // program_clock_reference_base
            q.write_bit(base & 1 == 1)?;
            q.write_bits(6, 0x3f)?; // reserved
            q.write_bits(9, extension as u32)?; // program_clock_reference_extension
        }

        if let Some(data) = &self.private_data {
            q.write_bits(8, data.len() as u32)?; // transport_private_data_length
            q.write_bytes(data)?;
        }

        let content = q.byte_len();
        q.fill_bytes(0xff, total_len - 1 - content)?;

        w.write_bytes(&q.into_bytes())?;
        w.patch_bits(start, 8, (total_len - 1) as u32)
    }
}

/// Builds the DVB AU_information data field for the first packet of a video
/// access unit. Only the PTS is signalled beyond the mandatory fields.
pub fn dvb_au_information(coding_format: u8, au: &AuInfo, pts: u64) -> Result<Bytes> {
    let mut r = BitWriter::with_capacity(8);
    r.write_bits(8, AU_INFORMATION_TAG as u32)?; // data_field_tag
    r.write_bits(8, 6)?; // data_field_length
    r.write_bits(4, coding_format as u32)?; // AU_coding_format
    r.write_bits(4, (au.frame_type & 0x0f) as u32)?; // AU_coding_type_information
    r.write_bits(2, (au.ref_pic_idc & 0x03) as u32)?; // AU_ref_pic_idc
    r.write_bits(2, (au.pic_struct & 0x03) as u32)?; // AU_pic_struct
    r.write_bit(true)?; // AU_PTS_present_flag
    r.write_bit(false)?; // AU_profile_info_present_flag
    r.write_bit(false)?; // AU_stream_info_present_flag
    r.write_bit(false)?; // AU_trick_mode_info_present_flag
    r.write_bits(32, (pts & 0xffff_ffff) as u32)?; // AU_PTS_32
    Ok(r.into_bytes())
}
