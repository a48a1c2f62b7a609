use crate::error::Result;
use crate::utils::BitWriter;

// Stream IDs
pub const STREAM_ID_VIDEO: u8 = 0xe0;
pub const STREAM_ID_MPEG_AUDIO: u8 = 0xc0;
pub const STREAM_ID_PRIVATE_1: u8 = 0xbd;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_NULL: u16 = 0x1fff;
pub const PID_MIN: u16 = 0x0010;
pub const PID_MAX: u16 = 0x1ffe;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary Stream Types
pub const STREAM_TYPE_MPEG2_VIDEO: u8 = 0x02;
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
pub const STREAM_TYPE_MPEG2_AUDIO: u8 = 0x04;
pub const STREAM_TYPE_PRIVATE_DATA: u8 = 0x06;
pub const STREAM_TYPE_ADTS: u8 = 0x0f;
pub const STREAM_TYPE_LATM: u8 = 0x11;
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_LPCM: u8 = 0x80;
pub const STREAM_TYPE_AC3: u8 = 0x81;
pub const STREAM_TYPE_DTS: u8 = 0x82;
pub const STREAM_TYPE_DOLBY_LOSSLESS: u8 = 0x83;
pub const STREAM_TYPE_DTS_HD: u8 = 0x85;
pub const STREAM_TYPE_DTS_HD_XLL: u8 = 0x86;
pub const STREAM_TYPE_EAC3: u8 = 0x87;
pub const STREAM_TYPE_PRESENTATION_GRAPHICS: u8 = 0x90;
pub const STREAM_TYPE_INTERACTIVE_GRAPHICS: u8 = 0x91;
pub const STREAM_TYPE_TEXT_SUBTITLE: u8 = 0x92;
pub const STREAM_TYPE_EAC3_SECONDARY: u8 = 0xa1;
pub const STREAM_TYPE_DTS_HD_SECONDARY: u8 = 0xa2;

// Constants
pub const SYNC_BYTE: u8 = 0x47;
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
pub const TS_PACKET_BITS: u64 = TS_PACKET_SIZE as u64 * 8;
/// Extra room given to PES scratch buffers on top of the payload.
pub const PES_HEADER_SLACK: usize = 200;
pub const PTS_HZ: u64 = 90_000;
pub const PCR_HZ: u64 = 27_000_000;
/// Timestamps wrap at 2^33.
pub const TIMESTAMP_MODULUS: u64 = 1 << 33;

/// Delivery profile of the transport stream. Decides stream_type mapping,
/// a few descriptors and which codecs are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsType {
    #[default]
    Generic,
    Atsc,
    Cablelabs,
    Dvb,
    BluRay,
    Isdb,
}

impl std::str::FromStr for TsType {
    type Err = crate::error::MuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(TsType::Generic),
            "atsc" => Ok(TsType::Atsc),
            "cablelabs" => Ok(TsType::Cablelabs),
            "dvb" => Ok(TsType::Dvb),
            "bluray" | "blu-ray" => Ok(TsType::BluRay),
            "isdb" => Ok(TsType::Isdb),
            other => Err(crate::error::MuxError::InvalidConfig(format!(
                "unknown transport stream type '{}'",
                other
            ))),
        }
    }
}

/// Elementary stream formats the muxer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Mpeg2Video,
    H264Video,
    Mpeg1Audio,
    Mpeg2Audio,
    AdtsAudio,
    LatmAudio,
    Ac3Audio,
    Eac3Audio,
    LpcmAudio,
    DtsAudio,
    DolbyLosslessAudio,
    DtsHdAudio,
    DtsHdXllAudio,
    Eac3SecondaryAudio,
    DtsHdSecondaryAudio,
    PresentationGraphics,
    InteractiveGraphics,
    TextSubtitle,
    Smpte302mAudio,
    DvbSubtitle,
    DvbTeletext,
    AncillaryRdd11,
    Ancillary2038,
}

impl StreamFormat {
    /// PMT stream_type for this format in a given transport stream type.
    pub fn stream_type(self, ts_type: TsType) -> u8 {
        use StreamFormat::*;
        match self {
            Mpeg2Video => STREAM_TYPE_MPEG2_VIDEO,
            H264Video => STREAM_TYPE_H264,
            Mpeg1Audio => STREAM_TYPE_MPEG1_AUDIO,
            Mpeg2Audio => STREAM_TYPE_MPEG2_AUDIO,
            AdtsAudio => STREAM_TYPE_ADTS,
            LatmAudio => STREAM_TYPE_LATM,
            Ac3Audio if ts_type == TsType::Dvb => STREAM_TYPE_PRIVATE_DATA,
            Ac3Audio => STREAM_TYPE_AC3,
            Eac3Audio if ts_type == TsType::Dvb => STREAM_TYPE_PRIVATE_DATA,
            Eac3Audio => STREAM_TYPE_EAC3,
            LpcmAudio => STREAM_TYPE_LPCM,
            DtsAudio => STREAM_TYPE_DTS,
            DolbyLosslessAudio => STREAM_TYPE_DOLBY_LOSSLESS,
            DtsHdAudio => STREAM_TYPE_DTS_HD,
            DtsHdXllAudio => STREAM_TYPE_DTS_HD_XLL,
            Eac3SecondaryAudio => STREAM_TYPE_EAC3_SECONDARY,
            DtsHdSecondaryAudio => STREAM_TYPE_DTS_HD_SECONDARY,
            PresentationGraphics => STREAM_TYPE_PRESENTATION_GRAPHICS,
            InteractiveGraphics => STREAM_TYPE_INTERACTIVE_GRAPHICS,
            TextSubtitle => STREAM_TYPE_TEXT_SUBTITLE,
            Smpte302mAudio | DvbSubtitle | DvbTeletext | AncillaryRdd11 | Ancillary2038 => {
                STREAM_TYPE_PRIVATE_DATA
            }
        }
    }

    /// PES stream_id used when the configuration does not name one.
    pub fn default_stream_id(self) -> u8 {
        use StreamFormat::*;
        match self {
            Mpeg2Video | H264Video => STREAM_ID_VIDEO,
            Mpeg1Audio | Mpeg2Audio | AdtsAudio | LatmAudio => STREAM_ID_MPEG_AUDIO,
            _ => STREAM_ID_PRIVATE_1,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, StreamFormat::Mpeg2Video | StreamFormat::H264Video)
    }

    pub fn is_lpcm_family(self) -> bool {
        matches!(self, StreamFormat::LpcmAudio | StreamFormat::Smpte302mAudio)
    }
}

/// A pre-encoded descriptor: tag plus body, written verbatim into a PMT loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

impl Descriptor {
    pub fn new(tag: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        2 + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn write_to(&self, w: &mut BitWriter) -> Result<()> {
        w.write_bits(8, self.tag as u32)?;
        w.write_bits(8, self.data.len() as u32)?;
        w.write_bytes(&self.data)
    }
}

/// adaptation_field_control values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationControl {
    PayloadOnly = 0b01,
    AdaptationOnly = 0b10,
    AdaptationAndPayload = 0b11,
}

impl AdaptationControl {
    pub fn has_payload(self) -> bool {
        self != AdaptationControl::AdaptationOnly
    }
}

#[derive(Debug, Clone)]
pub struct TSHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_control: AdaptationControl,
    pub continuity_counter: u8,
}

impl TSHeader {
    pub fn new(pid: u16, payload_unit_start: bool, adaptation_control: AdaptationControl, continuity_counter: u8) -> Self {
        Self {
            transport_error: false,
            payload_unit_start,
            transport_priority: false,
            pid,
            scrambling_control: 0,
            adaptation_control,
            continuity_counter,
        }
    }

    pub fn write_to(&self, w: &mut BitWriter) -> Result<()> {
        w.write_bits(8, SYNC_BYTE as u32)?;
        w.write_bit(self.transport_error)?;
        w.write_bit(self.payload_unit_start)?;
        w.write_bit(self.transport_priority)?;
        w.write_bits(13, (self.pid & 0x1fff) as u32)?;
        w.write_bits(2, self.scrambling_control as u32)?;
        w.write_bits(2, self.adaptation_control as u32)?;
        w.write_bits(4, (self.continuity_counter & 0x0f) as u32)
    }
}

/// Per-PID continuity counter. Advances only for packets that carry payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityCounter(u8);

impl ContinuityCounter {
    /// Counter for the next packet; advanced first when it carries payload.
    pub fn next(&mut self, has_payload: bool) -> u8 {
        if has_payload {
            self.0 = (self.0 + 1) & 0x0f;
        }
        self.0
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Splits a 27 MHz clock value into its 33-bit base and 9-bit extension.
pub fn split_pcr(pcr: u64) -> (u64, u16) {
    ((pcr / 300) % TIMESTAMP_MODULUS, (pcr % 300) as u16)
}

/// Converts a 90 kHz timestamp to seconds.
pub fn pts_to_seconds(pts: u64) -> f64 {
    pts as f64 / PTS_HZ as f64
}

/// A clock position in seconds as a 33-bit 90 kHz timestamp.
pub fn clock_pts(seconds: f64) -> u64 {
    (seconds * PTS_HZ as f64) as u64 % TIMESTAMP_MODULUS
}

/// Signed distance from `reference` to `ts` on the 33-bit timestamp circle.
///
/// Values up to half the circle ahead are positive, the rest negative.
pub fn dts_offset(ts: u64, reference: u64) -> i64 {
    let diff = ts.wrapping_sub(reference) % TIMESTAMP_MODULUS;
    if diff >= TIMESTAMP_MODULUS / 2 {
        diff as i64 - TIMESTAMP_MODULUS as i64
    } else {
        diff as i64
    }
}
