//! Program Association and Program Map Table sections.
//!
//! Sections are written into the payload of a single transport packet: a
//! pointer field, the section with its CRC-32 trailer, then 0xFF padding up
//! to the end of the packet writer.

use super::types::{Descriptor, TABLE_ID_PAT, TABLE_ID_PMT};
use crate::error::{MuxError, Result};
use crate::utils::{BitReader, BitWriter, Crc32Mpeg2};

/// One elementary stream entry of a PMT.
#[derive(Debug, Clone)]
pub struct PmtStream<'a> {
    pub stream_type: u8,
    pub pid: u16,
    pub descriptors: Vec<&'a Descriptor>,
}

/// Writes a PAT. `programs` are `(program_number, program_map_PID)` pairs.
pub fn write_pat(
    w: &mut BitWriter,
    transport_stream_id: u16,
    network_pid: Option<u16>,
    programs: &[(u16, u16)],
) -> Result<()> {
    w.write_bits(8, 0)?; // pointer_field

    let start = w.byte_len();
    let section_length = 9 + 4 * programs.len() + 4 * network_pid.is_some() as usize;
    w.write_bits(8, TABLE_ID_PAT as u32)?; // table_id
    w.write_bit(true)?; // section_syntax_indicator
    w.write_bit(false)?; // '0'
    w.write_bits(2, 0x3)?; // reserved
    w.write_bits(12, section_length as u32)?; // section_length
    w.write_bits(16, transport_stream_id as u32)?; // transport_stream_id
    w.write_bits(2, 0x3)?; // reserved
    w.write_bits(5, 0)?; // version_number
    w.write_bit(true)?; // current_next_indicator
    w.write_bits(8, 0)?; // section_number
    w.write_bits(8, 0)?; // last_section_number

    if let Some(pid) = network_pid {
        w.write_bits(16, 0)?; // program_number
        w.write_bits(3, 0x7)?; // reserved
        w.write_bits(13, pid as u32 & 0x1fff)?; // network_PID
    }
    for &(program_number, pmt_pid) in programs {
        w.write_bits(16, program_number as u32)?; // program_number
        w.write_bits(3, 0x7)?; // reserved
        w.write_bits(13, pmt_pid as u32 & 0x1fff)?; // program_map_PID
    }

    write_crc(w, start)?;
    let padding = w.remaining();
    w.fill_bytes(0xff, padding)
}

/// Writes a PMT. Section and loop lengths are patched in once known.
pub fn write_pmt(
    w: &mut BitWriter,
    program_number: u16,
    pcr_pid: u16,
    program_descriptors: &[&Descriptor],
    streams: &[PmtStream<'_>],
) -> Result<()> {
    w.write_bits(8, 0)?; // pointer_field

    let start = w.byte_len();
    w.write_bits(8, TABLE_ID_PMT as u32)?; // table_id
    w.write_bit(true)?; // section_syntax_indicator
    w.write_bit(false)?; // '0'
    w.write_bits(2, 0x3)?; // reserved
    let section_length_pos = w.pos();
    w.write_bits(12, 0)?; // section_length
    w.write_bits(16, program_number as u32)?; // program_number
    w.write_bits(2, 0x3)?; // reserved
    w.write_bits(5, 0)?; // version_number
    w.write_bit(true)?; // current_next_indicator
    w.write_bits(8, 0)?; // section_number
    w.write_bits(8, 0)?; // last_section_number
    w.write_bits(3, 0x7)?; // reserved
    w.write_bits(13, pcr_pid as u32 & 0x1fff)?; // PCR_PID

    w.write_bits(4, 0xf)?; // reserved
    write_descriptor_loop(w, program_descriptors)?; // program_info_length + descriptors

    for stream in streams {
        w.write_bits(8, stream.stream_type as u32)?; // stream_type
        w.write_bits(3, 0x7)?; // reserved
        w.write_bits(13, stream.pid as u32 & 0x1fff)?; // elementary_PID
        w.write_bits(4, 0xf)?; // reserved
        write_descriptor_loop(w, &stream.descriptors)?; // ES_info_length + descriptors
    }

    // Everything after section_length, including the CRC still to come
    let section_length = w.byte_len() + 4 - (section_length_pos + 12) / 8;
    if section_length > 1021 {
        return Err(MuxError::InvalidData(format!(
            "PMT section of {} bytes exceeds the section limit",
            section_length
        )));
    }
    w.patch_bits(section_length_pos, 12, section_length as u32)?;

    write_crc(w, start)?;
    let padding = w.remaining();
    w.fill_bytes(0xff, padding)
}

/// Writes a 12-bit length followed by the descriptors, patching the length.
fn write_descriptor_loop(w: &mut BitWriter, descriptors: &[&Descriptor]) -> Result<()> {
    let length_pos = w.pos();
    w.write_bits(12, 0)?;
    let body_start = w.byte_len();
    for d in descriptors {
        d.write_to(w)?;
    }
    let length = w.byte_len() - body_start;
    w.patch_bits(length_pos, 12, length as u32)
}

/// Appends the CRC-32 of everything written since byte `start`.
fn write_crc(w: &mut BitWriter, start: usize) -> Result<()> {
    w.flush();
    let crc = Crc32Mpeg2::calculate(&w.as_bytes()[start..]);
    w.write_bits(32, crc)
}

/// A PAT read back from a packet payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatSection {
    pub transport_stream_id: u16,
    pub network_pid: Option<u16>,
    /// `(program_number, program_map_PID)` in table order
    pub programs: Vec<(u16, u16)>,
    pub crc_valid: bool,
}

impl PatSection {
    /// Parses a PAT from a payload that starts at the pointer field.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let section = section_bytes(payload, TABLE_ID_PAT)?;
        let mut r = BitReader::new(&section[3..]);
        let transport_stream_id = r.read_bits(16)? as u16;
        r.skip_bits(24)?; // version, current_next, section numbers

        let mut network_pid = None;
        let mut programs = Vec::new();
        let entries = (section.len() - 8 - 4) / 4;
        for _ in 0..entries {
            let program_number = r.read_bits(16)? as u16;
            r.skip_bits(3)?;
            let pid = r.read_bits(13)? as u16;
            if program_number == 0 {
                network_pid = Some(pid);
            } else {
                programs.push((program_number, pid));
            }
        }

        Ok(Self {
            transport_stream_id,
            network_pid,
            programs,
            crc_valid: Crc32Mpeg2::verify(section),
        })
    }
}

/// One elementary stream entry read back from a PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtEntry {
    pub stream_type: u8,
    pub pid: u16,
    pub descriptors: Vec<Descriptor>,
}

/// A PMT read back from a packet payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtSection {
    pub program_number: u16,
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub streams: Vec<PmtEntry>,
    pub crc_valid: bool,
}

impl PmtSection {
    /// Parses a PMT from a payload that starts at the pointer field.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let section = section_bytes(payload, TABLE_ID_PMT)?;
        let body = &section[..section.len() - 4];
        let program_number = u16::from_be_bytes([body[3], body[4]]);
        let pcr_pid = u16::from_be_bytes([body[8], body[9]]) & 0x1fff;
        let info_len = (u16::from_be_bytes([body[10], body[11]]) & 0x0fff) as usize;
        let mut pos = 12;
        let program_descriptors = parse_descriptors(slice(body, pos, info_len)?)?;
        pos += info_len;

        let mut streams = Vec::new();
        while pos < body.len() {
            let head = slice(body, pos, 5)?;
            let es_len = (u16::from_be_bytes([head[3], head[4]]) & 0x0fff) as usize;
            streams.push(PmtEntry {
                stream_type: head[0],
                pid: u16::from_be_bytes([head[1], head[2]]) & 0x1fff,
                descriptors: parse_descriptors(slice(body, pos + 5, es_len)?)?,
            });
            pos += 5 + es_len;
        }

        Ok(Self {
            program_number,
            pcr_pid,
            program_descriptors,
            streams,
            crc_valid: Crc32Mpeg2::verify(section),
        })
    }
}

/// Returns the section from table_id through the CRC.
fn section_bytes(payload: &[u8], table_id: u8) -> Result<&[u8]> {
    let pointer = *payload
        .first()
        .ok_or_else(|| MuxError::InvalidData("empty PSI payload".into()))? as usize;
    let section = payload
        .get(1 + pointer..)
        .ok_or_else(|| MuxError::InvalidData("pointer field past payload".into()))?;
    if section.len() < 3 || section[0] != table_id {
        return Err(MuxError::InvalidData(format!(
            "expected table_id {:#04x}",
            table_id
        )));
    }
    let section_length = (u16::from_be_bytes([section[1], section[2]]) & 0x0fff) as usize;
    if section_length < 9 {
        return Err(MuxError::InvalidData("section too short".into()));
    }
    slice(section, 0, 3 + section_length)
}

fn slice(data: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    data.get(start..start + len)
        .ok_or_else(|| MuxError::InvalidData("truncated section".into()))
}

fn parse_descriptors(mut data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();
    while !data.is_empty() {
        let head = slice(data, 0, 2)?;
        let body = slice(data, 2, head[1] as usize)?;
        out.push(Descriptor::new(head[0], body.to_vec()));
        data = &data[2 + body.len()..];
    }
    Ok(out)
}
