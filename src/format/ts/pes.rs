use super::types::{StreamFormat, PES_HEADER_SLACK, TIMESTAMP_MODULUS};
use crate::av::{AuInfo, Frame};
use crate::error::{MuxError, Result};
use crate::utils::{BitReader, BitWriter};
use bytes::Bytes;
use log::warn;

/// Largest PES header this muxer writes: flags, length and PTS + DTS.
const MAX_PES_HEADER_DATA: usize = 3 + 10;

/// Stream properties that shape the PES header.
#[derive(Debug, Clone, Copy)]
pub struct PesStreamInfo {
    pub pid: u16,
    pub stream_id: u8,
    pub format: StreamFormat,
}

/// A framed PES packet waiting to be cut into transport packets.
///
/// `cur_pos` is the emission cursor; the packet is finished once
/// `bytes_left()` reaches zero.
#[derive(Debug, Clone)]
pub struct PESPacket {
    pub pid: u16,
    data: Bytes,
    cur_pos: usize,
    pub header_size: usize,
    pub pts: u64,
    pub dts: u64,
    pub random_access: bool,
    pub priority: bool,
    pub au_info: AuInfo,
}

impl PESPacket {
    /// Frames one access unit.
    ///
    /// PTS only is written when DTS equals PTS, both otherwise. Video PES
    /// packets are unbounded (PES_packet_length 0). A DTS later than the PTS
    /// is logged and the values are written as given.
    pub fn from_frame(stream: &PesStreamInfo, frame: &Frame) -> Result<Self> {
        if frame.dts > frame.pts {
            warn!(
                "PID {:#06x}: DTS {} > PTS {}, writing PES anyway",
                stream.pid, frame.dts, frame.pts
            );
        }

        let same_timestamps = frame.dts == frame.pts;

        // Everything after PES_packet_length goes to a scratch writer first so
        // its size is known when the length field is written.
        let mut q = BitWriter::with_capacity(MAX_PES_HEADER_DATA);
        q.write_bits(2, 0b10)?;
        q.write_bits(2, 0)?; // PES_scrambling_control
        q.write_bit(false)?; // PES_priority
        q.write_bit(stream.format != StreamFormat::AncillaryRdd11)?; // data_alignment_indicator
        q.write_bit(true)?; // copyright
        q.write_bit(true)?; // original_or_copy
        q.write_bits(2, 0b10 | !same_timestamps as u32)?; // PTS_DTS_flags
        q.write_bits(6, 0)?; // ESCR, ES_rate, DSM_trick_mode, additional_copy_info, PES_CRC, PES_extension
        q.write_bits(8, if same_timestamps { 5 } else { 10 })?; // PES_header_data_length

        q.write_bits(4, 0b0010 | !same_timestamps as u32)?;
        write_timestamp(&mut q, frame.pts)?;
        if !same_timestamps {
            q.write_bits(4, 0b0001)?;
            write_timestamp(&mut q, frame.dts)?;
        }
        let header_data = q.into_bytes();

        let total_size = frame.len() + header_data.len();
        let packet_length = if stream.format.is_video() {
            0
        } else if total_size > u16::MAX as usize {
            return Err(MuxError::InvalidData(format!(
                "PID {:#06x}: {} byte access unit does not fit a bounded PES packet",
                stream.pid,
                frame.len()
            )));
        } else {
            total_size as u32
        };

        let mut s = BitWriter::with_capacity(frame.len() + PES_HEADER_SLACK);
        s.write_bits(24, 1)?; // packet_start_code_prefix
        s.write_bits(8, stream.stream_id as u32)?;
        s.write_bits(16, packet_length)?;
        s.write_bytes(&header_data)?;
        let header_size = s.byte_len();
        s.write_bytes(&frame.data)?;

        Ok(Self {
            pid: stream.pid,
            data: s.into_bytes(),
            cur_pos: 0,
            header_size,
            pts: frame.pts,
            dts: frame.dts,
            random_access: frame.random_access,
            priority: frame.priority,
            au_info: frame.au_info,
        })
    }

    /// Total framed size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes_left(&self) -> usize {
        self.data.len() - self.cur_pos
    }

    /// True until the first transport packet of this PES has been cut.
    pub fn at_start(&self) -> bool {
        self.cur_pos == 0
    }

    /// The whole framed packet.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Cuts the next `n` bytes (or what is left) and advances the cursor.
    pub fn take(&mut self, n: usize) -> Bytes {
        let end = (self.cur_pos + n).min(self.data.len());
        let chunk = self.data.slice(self.cur_pos..end);
        self.cur_pos = end;
        chunk
    }
}

/// Writes a 33-bit timestamp as 3/1/15/1/15/1 bits with marker bits set.
/// The caller writes the 4-bit prefix that completes the 5 bytes.
pub fn write_timestamp(w: &mut BitWriter, timestamp: u64) -> Result<()> {
    let ts = timestamp % TIMESTAMP_MODULUS;
    w.write_bits(3, ((ts >> 30) & 0x07) as u32)?; // timestamp [32..30]
    w.write_bit(true)?; // marker_bit
    w.write_bits(15, ((ts >> 15) & 0x7fff) as u32)?; // timestamp [29..15]
    w.write_bit(true)?; // marker_bit
    w.write_bits(15, (ts & 0x7fff) as u32)?; // timestamp [14..0]
    w.write_bit(true) // marker_bit
}

/// Decodes a 5-byte PTS/DTS field, checking the marker bits.
pub fn read_timestamp(field: &[u8]) -> Result<u64> {
    if field.len() < 5 {
        return Err(MuxError::InvalidData("timestamp field shorter than 5 bytes".into()));
    }
    let mut r = BitReader::new(&field[..5]);
    r.skip_bits(4)?;
    let high = r.read_bits(3)? as u64;
    let m1 = r.read_bit()?;
    let mid = r.read_bits(15)? as u64;
    let m2 = r.read_bit()?;
    let low = r.read_bits(15)? as u64;
    let m3 = r.read_bit()?;
    if !(m1 && m2 && m3) {
        return Err(MuxError::InvalidData("timestamp marker bit not set".into()));
    }
    Ok((high << 30) | (mid << 15) | low)
}

/// Fields of a PES header as read back from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PESHeader {
    pub stream_id: u8,
    pub packet_length: u16,
    pub data_alignment: bool,
    pub pts_dts_flags: u8,
    pub header_data_length: u8,
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

impl PESHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 9 || data[0..3] != [0x00, 0x00, 0x01] {
            return Err(MuxError::InvalidData("missing PES start code".into()));
        }
        let stream_id = data[3];
        let packet_length = u16::from_be_bytes([data[4], data[5]]);
        let data_alignment = data[6] & 0x04 != 0;
        let pts_dts_flags = data[7] >> 6;
        let header_data_length = data[8];
        if data.len() < 9 + header_data_length as usize {
            return Err(MuxError::InvalidData("truncated PES header".into()));
        }

        let pts = if pts_dts_flags & 0b10 != 0 {
            Some(read_timestamp(&data[9..])?)
        } else {
            None
        };
        let dts = if pts_dts_flags == 0b11 {
            Some(read_timestamp(&data[14..])?)
        } else {
            None
        };

        Ok(Self {
            stream_id,
            packet_length,
            data_alignment,
            pts_dts_flags,
            header_data_length,
            pts,
            dts,
        })
    }

    /// Bytes before the payload.
    pub fn header_len(&self) -> usize {
        9 + self.header_data_length as usize
    }
}
