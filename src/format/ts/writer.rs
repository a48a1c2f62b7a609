//! The transport stream writer: stream setup, frame intake and the packet
//! scheduler.
//!
//! [`TsWriter`] is synchronous and produces one 188 byte packet per call to
//! [`TsWriter::next_packet`]. Which packet goes out is decided by the
//! repetition periods of the PSI tables, the PCR period and the state of
//! each stream's transport buffer:
//!
//! 1. a PAT when one is due, followed by the PMT of every program,
//! 2. a PCR when one is due, on a payload packet of the PCR stream if it can
//!    send one, as an adaptation-field-only packet otherwise,
//! 3. the pending PES data with the earliest DTS whose transport buffer has
//!    room for another packet,
//! 4. a null packet.
//!
//! Every packet, whatever its PID, moves the clock of every program forward
//! by one packet time at the multiplex rate.

use super::adaptation::{
    dvb_au_information, AdaptationField, AU_CODING_FORMAT_H264, AU_CODING_FORMAT_MPEG2,
};
use super::clock::packet_time;
use super::descriptors::{self, HDMV_FORMAT_ID, SMPTE_302M_FORMAT_ID};
use super::pes::PESPacket;
use super::psi::{self, PmtStream};
use super::stream::{Program, Stream};
use super::types::*;
use crate::av::Frame;
use crate::codec::smpte302m::{self, SMPTE_302M_AUDIO_BS};
use crate::codec::{
    h264, mpeg2, CodecContext, LpcmContext, MpegVideoContext, StreamTiming, VideoParams,
};
use crate::config::WriterConfig;
use crate::error::{MuxError, Result};
use crate::utils::BitWriter;
use bytes::Bytes;
use log::{debug, trace, warn};
use std::collections::{HashSet, VecDeque};

/// What a packet produced by [`TsWriter::next_packet`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Pat,
    Pmt,
    Pes,
    PcrOnly,
    Null,
}

/// One finished transport packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPacket {
    pub kind: PacketKind,
    pub pid: u16,
    /// Exactly [`TS_PACKET_SIZE`] bytes
    pub data: Bytes,
}

impl TsPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whether the packet carries a PCR.
    pub fn has_pcr(&self) -> bool {
        let afc = (self.data[3] >> 4) & 0x3;
        afc & 0b10 != 0 && self.data[4] > 0 && self.data[5] & 0x10 != 0
    }
}

/// Multiplexer state of one output transport stream.
#[derive(Debug)]
pub struct TsWriter {
    ts_type: TsType,
    mux_rate: u64,
    transport_stream_id: u16,
    network_pid: Option<u16>,
    pat_period: f64,
    pcr_period: f64,
    start_delay: f64,
    pat_cc: ContinuityCounter,
    last_pat_time: Option<f64>,
    pending_pmts: VecDeque<usize>,
    programs: Vec<Program>,
    started: bool,
    packets_written: u64,
}

impl TsWriter {
    /// Validates the configuration and creates the writer.
    pub fn new(config: WriterConfig) -> Result<Self> {
        validate(&config)?;

        let programs: Vec<Program> = config.programs.iter().map(Program::from_config).collect();
        debug!(
            "created {:?} writer: {} program(s) at {} bit/s",
            config.ts_type,
            programs.len(),
            config.mux_rate
        );

        Ok(Self {
            ts_type: config.ts_type,
            mux_rate: config.mux_rate,
            transport_stream_id: config.transport_stream_id,
            network_pid: config.network_pid,
            pat_period: config.pat_period,
            pcr_period: config.pcr_period,
            start_delay: config.start_delay,
            pat_cc: ContinuityCounter::default(),
            last_pat_time: None,
            pending_pmts: VecDeque::new(),
            programs,
            started: false,
            packets_written: 0,
        })
    }

    /// Configures the T-STD parameters of an MPEG-2 or H.264 video stream.
    ///
    /// `level`/`profile` are the MPEG-2 level and profile constants, or the
    /// H.264 `level_idc` and profile index. `frame_rate` must have an MPEG-2
    /// `frame_rate_code` for MPEG-2 streams and is ignored for H.264.
    /// Nothing changes on error.
    pub fn setup_mpegvideo_stream(
        &mut self,
        pid: u16,
        level: i32,
        profile: i32,
        vbv_maxrate: u64,
        vbv_bufsize: u64,
        frame_rate: f64,
    ) -> Result<()> {
        let stream = self.find_stream(pid).ok_or(MuxError::InvalidPid(pid))?;

        let (params, timing) = match stream.format {
            StreamFormat::Mpeg2Video => {
                let limits = mpeg2::validate(level, profile)?;
                (
                    VideoParams::Mpeg2 {
                        level: limits.level,
                        profile: limits.profile,
                    },
                    StreamTiming::mpeg2(limits, vbv_maxrate, vbv_bufsize),
                )
            }
            StreamFormat::H264Video => {
                let (limits, profile) = h264::validate(level, profile)?;
                (
                    VideoParams::H264 {
                        level_idc: limits.level_idc,
                        profile,
                    },
                    StreamTiming::h264(limits),
                )
            }
            _ => return Err(MuxError::NotVideoStream(pid)),
        };

        // Only the MPEG-2 video descriptor carries a frame_rate_code
        let frame_rate_code = match params {
            VideoParams::Mpeg2 { .. } => {
                mpeg2::frame_rate_code(frame_rate).ok_or(MuxError::InvalidFrameRate(frame_rate))?
            }
            VideoParams::H264 { .. } => 0,
        };
        if vbv_maxrate == 0 || vbv_bufsize == 0 {
            return Err(MuxError::InvalidData(format!(
                "PID {:#06x}: VBV rate and size must be non-zero",
                pid
            )));
        }

        let stream = self.find_stream_mut(pid).ok_or(MuxError::InvalidPid(pid))?;
        stream.codec = CodecContext::MpegVideo(MpegVideoContext {
            params,
            buffer_size: vbv_bufsize as f64 / vbv_maxrate as f64,
            frame_rate_code,
        });
        stream.apply_timing(&timing);
        debug!(
            "PID {:#06x}: video setup {:?}, rx {} rbx {} mb {} eb {}",
            pid, params, timing.rx, timing.rbx, timing.mb_size, timing.eb_size
        );
        Ok(())
    }

    /// Configures an SMPTE 302M audio stream. Nothing changes on error.
    pub fn setup_302m_stream(&mut self, pid: u16, bit_depth: u32, num_channels: u32) -> Result<()> {
        if self.ts_type == TsType::BluRay {
            return Err(MuxError::DisallowedForProfile("SMPTE 302M"));
        }
        smpte302m::validate(bit_depth, num_channels)?;

        let stream = self.find_stream_mut(pid).ok_or(MuxError::InvalidPid(pid))?;
        if !stream.format.is_lpcm_family() {
            return Err(MuxError::NotLpcmStream(pid));
        }

        stream.codec = CodecContext::Lpcm(LpcmContext {
            bits_per_sample: bit_depth,
            num_channels,
        });
        stream.rx = smpte302m::leak_rate(bit_depth);
        stream.eb.set_size(SMPTE_302M_AUDIO_BS);
        debug!(
            "PID {:#06x}: 302M setup {} bit, {} channels, rx {}",
            pid, bit_depth, num_channels, stream.rx
        );
        Ok(())
    }

    /// Packetizes one access unit and queues it on its stream.
    ///
    /// The first frame starts the clock `start_delay` seconds before its DTS.
    pub fn push_frame(&mut self, frame: Frame) -> Result<()> {
        let stream = self.find_stream(frame.pid).ok_or(MuxError::InvalidPid(frame.pid))?;
        let pes = PESPacket::from_frame(&stream.pes_info(), &frame)?;

        if !self.started {
            self.start_clock(pts_to_seconds(frame.dts));
        }

        let stream = self
            .find_stream_mut(frame.pid)
            .ok_or(MuxError::InvalidPid(frame.pid))?;
        trace!(
            "PID {:#06x}: queued {} byte PES, dts {}",
            frame.pid,
            pes.len(),
            pes.dts
        );
        stream.queue.push_back(pes);
        Ok(())
    }

    fn start_clock(&mut self, first_dts: f64) {
        let start = (first_dts - self.start_delay).max(0.0);
        for program in &mut self.programs {
            program.clock.restart(start);
            for stream in &mut program.streams {
                stream.tb.reset();
                stream.mb.reset();
                stream.eb.reset();
            }
        }
        self.last_pat_time = None;
        self.started = true;
        debug!("system clock starts at {:.6}s", start);
    }

    /// Produces the next transport packet.
    pub fn next_packet(&mut self) -> Result<TsPacket> {
        self.drip_buffers();

        let packet = if self.pat_due() {
            self.write_pat()?
        } else if let Some(index) = self.pending_pmts.pop_front() {
            self.write_pmt(index)?
        } else if let Some(index) = self.pcr_due() {
            self.write_pcr(index)?
        } else if let Some((pi, si)) = self.next_pes_stream() {
            self.write_pes_packet(pi, si, false)?
        } else {
            self.write_null_packet()?
        };

        for program in &mut self.programs {
            program.clock.advance(1, self.mux_rate);
        }
        self.packets_written += 1;
        trace!("packet {} {:?} on PID {:#06x}", self.packets_written, packet.kind, packet.pid);
        Ok(packet)
    }

    /// Produces packets until the first program's clock reaches `seconds`.
    pub fn write_until(&mut self, seconds: f64) -> Result<Vec<TsPacket>> {
        let mut packets = Vec::new();
        while self.programs[0].clock.cur_pcr() < seconds {
            packets.push(self.next_packet()?);
        }
        Ok(packets)
    }

    /// Produces packets until no PES data is left.
    pub fn drain(&mut self) -> Result<Vec<TsPacket>> {
        let mut packets = Vec::new();
        while self.has_pending() {
            packets.push(self.next_packet()?);
        }
        Ok(packets)
    }

    pub fn has_pending(&self) -> bool {
        self.programs
            .iter()
            .flat_map(|p| p.streams.iter())
            .any(|s| !s.queue.is_empty())
    }

    pub fn ts_type(&self) -> TsType {
        self.ts_type
    }

    pub fn mux_rate(&self) -> u64 {
        self.mux_rate
    }

    /// Duration of one packet at the multiplex rate, in seconds.
    pub fn packet_time(&self) -> f64 {
        packet_time(self.mux_rate)
    }

    /// Lead of the system clock over the first DTS, in seconds.
    pub fn start_delay(&self) -> f64 {
        self.start_delay
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, program_number: u16) -> Option<&Program> {
        self.programs
            .iter()
            .find(|p| p.program_number == program_number)
    }

    pub fn stream(&self, pid: u16) -> Option<&Stream> {
        self.find_stream(pid)
    }

    fn find_stream(&self, pid: u16) -> Option<&Stream> {
        self.programs.iter().find_map(|p| p.stream(pid))
    }

    fn find_stream_mut(&mut self, pid: u16) -> Option<&mut Stream> {
        self.programs.iter_mut().find_map(|p| p.stream_mut(pid))
    }

    /// Drains every transport buffer up to the end of the coming packet.
    fn drip_buffers(&mut self) {
        let step = self.packet_time();
        for program in &mut self.programs {
            let now = program.clock.cur_pcr();
            for stream in &mut program.streams {
                stream.tb.drip(stream.rx, now, now + step);
            }
        }
    }

    fn pat_due(&self) -> bool {
        match self.last_pat_time {
            None => true,
            Some(t) => self.programs[0].clock.cur_pcr() - t >= self.pat_period,
        }
    }

    fn pcr_due(&self) -> Option<usize> {
        self.programs
            .iter()
            .position(|p| p.clock.pcr_due(self.pcr_period))
    }

    /// The stream whose head PES has the earliest DTS and room in its
    /// transport buffer. DTS values are compared relative to the program
    /// clock so that streams crossing the 33-bit wrap keep their order.
    fn next_pes_stream(&self) -> Option<(usize, usize)> {
        let mut best: Option<(i64, usize, usize)> = None;
        for (pi, program) in self.programs.iter().enumerate() {
            let now = clock_pts(program.clock.cur_pcr());
            for (si, stream) in program.streams.iter().enumerate() {
                let Some(dts) = stream.next_dts().map(|dts| dts_offset(dts, now)) else {
                    continue;
                };
                if !stream.tb.has_room() {
                    continue;
                }
                if best.map_or(true, |(best_dts, _, _)| dts < best_dts) {
                    best = Some((dts, pi, si));
                }
            }
        }
        best.map(|(_, pi, si)| (pi, si))
    }

    fn write_pat(&mut self) -> Result<TsPacket> {
        let mut w = BitWriter::with_capacity(TS_PACKET_SIZE);
        TSHeader::new(
            PID_PAT,
            true,
            AdaptationControl::PayloadOnly,
            self.pat_cc.next(true),
        )
        .write_to(&mut w)?;

        let entries: Vec<(u16, u16)> = self
            .programs
            .iter()
            .map(|p| (p.program_number, p.pmt_pid))
            .collect();
        psi::write_pat(&mut w, self.transport_stream_id, self.network_pid, &entries)?;

        self.last_pat_time = Some(self.programs[0].clock.cur_pcr());
        self.pending_pmts = (0..self.programs.len()).collect();
        Ok(finish(PacketKind::Pat, PID_PAT, w))
    }

    fn write_pmt(&mut self, index: usize) -> Result<TsPacket> {
        let ts_type = self.ts_type;
        let program = &mut self.programs[index];

        let mut program_descriptors = Vec::new();
        if ts_type == TsType::BluRay {
            program_descriptors.push(descriptors::registration(HDMV_FORMAT_ID));
        }
        if let Some(sb) = &program.smoothing_buffer {
            program_descriptors.push(descriptors::smoothing_buffer(sb)?);
        }

        let es_descriptors = program
            .streams
            .iter()
            .map(|s| stream_descriptors(ts_type, s))
            .collect::<Result<Vec<_>>>()?;
        let entries: Vec<PmtStream<'_>> = program
            .streams
            .iter()
            .zip(&es_descriptors)
            .map(|(s, own)| PmtStream {
                stream_type: s.format.stream_type(ts_type),
                pid: s.pid,
                descriptors: own.iter().chain(&s.descriptors).collect(),
            })
            .collect();
        let program_refs: Vec<&Descriptor> = program_descriptors.iter().collect();

        let mut w = BitWriter::with_capacity(TS_PACKET_SIZE);
        TSHeader::new(
            program.pmt_pid,
            true,
            AdaptationControl::PayloadOnly,
            program.pmt_cc.next(true),
        )
        .write_to(&mut w)?;
        psi::write_pmt(
            &mut w,
            program.program_number,
            program.pcr_pid,
            &program_refs,
            &entries,
        )?;
        Ok(finish(PacketKind::Pmt, program.pmt_pid, w))
    }

    /// Sends the due PCR of a program, with PCR stream payload when the
    /// stream has data and room for it.
    fn write_pcr(&mut self, index: usize) -> Result<TsPacket> {
        let program = &self.programs[index];
        if let Some(si) = program.pcr_stream {
            let stream = &program.streams[si];
            if !stream.queue.is_empty() && stream.tb.has_room() {
                return self.write_pes_packet(index, si, true);
            }
        }
        self.write_pcr_only(index)
    }

    fn write_pcr_only(&mut self, index: usize) -> Result<TsPacket> {
        let mux_rate = self.mux_rate;
        let Program {
            clock,
            streams,
            pcr_stream,
            pcr_pid,
            ..
        } = &mut self.programs[index];

        let cc = match pcr_stream {
            Some(si) => {
                let stream = &mut streams[*si];
                if !stream.tb.has_room() {
                    warn!(
                        "PID {:#06x}: PCR-only packet saturates the transport buffer",
                        stream.pid
                    );
                }
                stream.tb.add_packet();
                stream.cc.next(false)
            }
            None => 0,
        };

        let discontinuity = clock.discontinuity_pending();
        let (base, extension) = clock.stamp(mux_rate);
        let mut af = AdaptationField::with_pcr(base, extension);
        af.discontinuity = discontinuity;
        let mut w = BitWriter::with_capacity(TS_PACKET_SIZE);
        TSHeader::new(*pcr_pid, false, AdaptationControl::AdaptationOnly, cc).write_to(&mut w)?;
        af.write_to(&mut w, TS_PAYLOAD_SIZE)?;
        Ok(finish(PacketKind::PcrOnly, *pcr_pid, w))
    }

    /// Cuts the next transport packet from the head PES of a stream.
    fn write_pes_packet(&mut self, pi: usize, si: usize, with_pcr: bool) -> Result<TsPacket> {
        let mux_rate = self.mux_rate;
        let Program { clock, streams, .. } = &mut self.programs[pi];
        let stream = &mut streams[si];
        let pid = stream.pid;
        let format = stream.format;
        let dvb_au = stream.dvb_au;
        let pes = stream
            .queue
            .front_mut()
            .ok_or_else(|| MuxError::InvalidData(format!("PID {:#06x}: no PES pending", pid)))?;

        let first = pes.at_start();
        let mut af = AdaptationField::default();
        if first {
            af.random_access = pes.random_access;
            af.priority = pes.priority;
            if dts_offset(pes.dts, clock_pts(clock.cur_pcr())) < 0 {
                warn!(
                    "PID {:#06x}: PES with dts {} is late, clock is at {:.6}s",
                    pid,
                    pes.dts,
                    clock.cur_pcr()
                );
            }
            if dvb_au {
                let coding_format = match format {
                    StreamFormat::Mpeg2Video => Some(AU_CODING_FORMAT_MPEG2),
                    StreamFormat::H264Video => Some(AU_CODING_FORMAT_H264),
                    _ => None,
                };
                if let Some(coding_format) = coding_format {
                    af.private_data = Some(dvb_au_information(coding_format, &pes.au_info, pes.pts)?);
                }
            }
        }
        if with_pcr {
            af.discontinuity = clock.discontinuity_pending();
            af.pcr = Some(clock.stamp(mux_rate));
        }

        let payload_len = pes.bytes_left().min(TS_PAYLOAD_SIZE - af.min_len());
        let af_len = TS_PAYLOAD_SIZE - payload_len;
        let control = if af_len == 0 {
            AdaptationControl::PayloadOnly
        } else {
            AdaptationControl::AdaptationAndPayload
        };

        let mut w = BitWriter::with_capacity(TS_PACKET_SIZE);
        TSHeader::new(pid, first, control, stream.cc.next(true)).write_to(&mut w)?;
        if af_len > 0 {
            af.write_to(&mut w, af_len)?;
        }
        w.write_bytes(&pes.take(payload_len))?;

        if pes.bytes_left() == 0 {
            stream.queue.pop_front();
        }
        stream.tb.add_packet();
        Ok(finish(PacketKind::Pes, pid, w))
    }

    fn write_null_packet(&mut self) -> Result<TsPacket> {
        let mut w = BitWriter::with_capacity(TS_PACKET_SIZE);
        TSHeader::new(PID_NULL, false, AdaptationControl::PayloadOnly, 0).write_to(&mut w)?;
        w.fill_bytes(0xff, TS_PAYLOAD_SIZE)?;
        Ok(finish(PacketKind::Null, PID_NULL, w))
    }
}

fn finish(kind: PacketKind, pid: u16, w: BitWriter) -> TsPacket {
    TsPacket {
        kind,
        pid,
        data: w.into_bytes(),
    }
}

/// Descriptors the muxer itself writes into a stream's ES_info loop.
fn stream_descriptors(ts_type: TsType, stream: &Stream) -> Result<Vec<Descriptor>> {
    let mut out = Vec::new();
    match stream.format {
        StreamFormat::Mpeg2Video | StreamFormat::H264Video => {
            if let Some(ctx) = stream.codec.video() {
                out.extend(descriptors::video_stream(ctx)?);
                out.extend(descriptors::avc(ctx)?);
            }
            out.push(descriptors::data_stream_alignment());
        }
        StreamFormat::Ac3Audio => out.extend(descriptors::ac3(ts_type, false)),
        StreamFormat::Eac3Audio => out.extend(descriptors::ac3(ts_type, true)),
        StreamFormat::Smpte302mAudio => out.push(descriptors::registration(SMPTE_302M_FORMAT_ID)),
        _ => {}
    }
    if let Some(lang) = stream.language {
        out.push(descriptors::iso_639_language(lang));
    }
    Ok(out)
}

fn validate(config: &WriterConfig) -> Result<()> {
    if config.mux_rate == 0 {
        return Err(MuxError::InvalidConfig("mux rate must be positive".into()));
    }
    if !(config.pat_period > 0.0) || !(config.pcr_period > 0.0) {
        return Err(MuxError::InvalidConfig(
            "PAT and PCR periods must be positive".into(),
        ));
    }
    if config.programs.is_empty() {
        return Err(MuxError::InvalidConfig("at least one program is required".into()));
    }

    let in_range = |pid: u16| (PID_MIN..=PID_MAX).contains(&pid);
    let mut used = HashSet::new();
    let mut claim = |pid: u16| {
        if in_range(pid) && used.insert(pid) {
            Ok(())
        } else {
            Err(MuxError::InvalidPid(pid))
        }
    };

    if let Some(pid) = config.network_pid {
        claim(pid)?;
    }
    let mut numbers = HashSet::new();
    for program in &config.programs {
        if program.program_number == 0 || !numbers.insert(program.program_number) {
            return Err(MuxError::InvalidConfig(format!(
                "program number {} is reserved or repeated",
                program.program_number
            )));
        }
        if program.streams.is_empty() {
            return Err(MuxError::InvalidConfig(format!(
                "program {} has no streams",
                program.program_number
            )));
        }
        claim(program.pmt_pid)?;
        for stream in &program.streams {
            claim(stream.pid)?;
        }
    }

    for program in &config.programs {
        let pcr_pid = program.pcr_pid;
        let own_stream = program.streams.iter().any(|s| s.pid == pcr_pid);
        let is_pmt = config.programs.iter().any(|p| p.pmt_pid == pcr_pid);
        // A PCR-only packet must share the continuity counter of the stream
        // on its PID, which only works within one program
        let foreign_stream = config
            .programs
            .iter()
            .filter(|p| p.program_number != program.program_number)
            .flat_map(|p| p.streams.iter())
            .any(|s| s.pid == pcr_pid);
        if !in_range(pcr_pid) || is_pmt || foreign_stream || config.network_pid == Some(pcr_pid) {
            return Err(MuxError::InvalidPid(pcr_pid));
        }
        if !own_stream {
            debug!(
                "program {}: PCR on PID {:#06x} without a stream",
                program.program_number, pcr_pid
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProgramConfig, StreamConfig};
    use pretty_assertions::assert_eq;

    fn writer() -> TsWriter {
        TsWriter::new(
            WriterConfig::new(TsType::Generic, 1_504_000).with_program(
                ProgramConfig::new(1, 0x20, 0x100)
                    .with_stream(StreamConfig::new(0x100, StreamFormat::Mpeg2Video))
                    .with_stream(StreamConfig::new(0x101, StreamFormat::Mpeg2Audio)),
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert!(matches!(
            TsWriter::new(WriterConfig::default()),
            Err(MuxError::InvalidConfig(_))
        ));
        let dup = WriterConfig::default().with_program(
            ProgramConfig::new(1, 0x20, 0x100)
                .with_stream(StreamConfig::new(0x100, StreamFormat::H264Video))
                .with_stream(StreamConfig::new(0x20, StreamFormat::Mpeg2Audio)),
        );
        assert!(matches!(TsWriter::new(dup), Err(MuxError::InvalidPid(0x20))));
        let low = WriterConfig::default().with_program(
            ProgramConfig::new(1, 0x20, 0x08).with_stream(StreamConfig::new(0x08, StreamFormat::H264Video)),
        );
        assert!(matches!(TsWriter::new(low), Err(MuxError::InvalidPid(0x08))));
        let empty = WriterConfig::default().with_program(ProgramConfig::new(1, 0x20, 0x100));
        assert!(matches!(TsWriter::new(empty), Err(MuxError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_timing_before_setup() {
        let w = writer();
        let video = w.stream(0x100).unwrap();
        assert_eq!(video.tb().size(), 4096);
        assert_eq!(video.eb().size(), 1_835_008);
        let audio = w.stream(0x101).unwrap();
        assert_eq!(audio.rx(), 2_000_000.0);
        assert_eq!(audio.eb().size(), 3584 * 8);
        assert!(audio.codec().is_none());
    }

    #[test]
    fn test_psi_then_pcr_then_null() {
        let mut w = writer();
        let kinds: Vec<PacketKind> = (0..4).map(|_| w.next_packet().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![PacketKind::Pat, PacketKind::Pmt, PacketKind::PcrOnly, PacketKind::Null]
        );
        assert_eq!(w.packets_written(), 4);
    }

    #[test]
    fn test_pat_repeats_after_period() {
        // 1000 packets per second, PAT every 100 packets
        let mut w = writer();
        let packets = w.write_until(0.25).unwrap();
        let pats: Vec<usize> = packets
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == PacketKind::Pat)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(pats.len(), 3);
        assert_eq!(packets[pats[1] + 1].kind, PacketKind::Pmt);
        assert!(pats[1] >= 99 && pats[1] <= 101);
    }

    #[test]
    fn test_pmt_carries_setup_descriptors() {
        let mut w = writer();
        w.setup_mpegvideo_stream(
            0x100,
            mpeg2::MPEG2_LEVEL_MAIN,
            mpeg2::MPEG2_PROFILE_MAIN,
            15_000_000,
            1_835_008,
            25.0,
        )
        .unwrap();
        w.next_packet().unwrap();
        let pmt = w.next_packet().unwrap();
        let parsed = psi::PmtSection::parse(&pmt.data[4..]).unwrap();
        assert!(parsed.crc_valid);
        assert_eq!(parsed.pcr_pid, 0x100);
        assert_eq!(parsed.streams[0].stream_type, STREAM_TYPE_MPEG2_VIDEO);
        assert_eq!(parsed.streams[0].descriptors[0].tag, 0x02);
        assert_eq!(parsed.streams[0].descriptors[0].data[0] >> 3, 3);
        assert_eq!(parsed.streams[1].stream_type, STREAM_TYPE_MPEG2_AUDIO);
    }

    #[test]
    fn test_setup_errors_leave_stream_untouched() {
        let mut w = writer();
        assert!(matches!(
            w.setup_mpegvideo_stream(0x101, 1, 1, 1, 1, 25.0),
            Err(MuxError::NotVideoStream(0x101))
        ));
        assert!(matches!(
            w.setup_mpegvideo_stream(0x100, 1, 1, 15_000_000, 1_835_008, 12.0),
            Err(MuxError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            w.setup_mpegvideo_stream(0x555, 1, 1, 1, 1, 25.0),
            Err(MuxError::InvalidPid(0x555))
        ));
        assert!(w.stream(0x100).unwrap().codec().is_none());
    }

    #[test]
    fn test_pes_first_packet_flags() {
        let mut w = writer();
        w.push_frame(
            Frame::new(0x101, vec![0x11; 400])
                .with_timestamp(90_000)
                .with_random_access(true),
        )
        .unwrap();
        let packets = w.drain().unwrap();
        let pes: Vec<&TsPacket> = packets.iter().filter(|p| p.kind == PacketKind::Pes).collect();
        assert_eq!(pes.len(), 3);

        let first = pes[0].as_bytes();
        assert_eq!(first[1] & 0x40, 0x40);
        assert_eq!((first[3] >> 4) & 0x3, 0b11);
        assert_eq!(first[5] & 0x40, 0x40);
        assert_eq!(pes[1].as_bytes()[1] & 0x40, 0);
        assert_eq!(pes[1].as_bytes()[3] >> 4 & 0x3, 0b01);

        let cc: Vec<u8> = pes.iter().map(|p| p.as_bytes()[3] & 0x0f).collect();
        assert_eq!(cc, vec![1, 2, 3]);
    }
}
