use super::buffer::LeakyBuffer;
use super::clock::ProgramClock;
use super::descriptors::SmoothingBuffer;
use super::pes::{PESPacket, PesStreamInfo};
use super::types::{ContinuityCounter, Descriptor, StreamFormat};
use crate::codec::{h264, mpeg2, CodecContext, StreamTiming};
use crate::config::{ProgramConfig, StreamConfig};
use std::collections::VecDeque;

/// One elementary stream of a program, with its T-STD model.
#[derive(Debug, Clone)]
pub struct Stream {
    pub(crate) pid: u16,
    pub(crate) format: StreamFormat,
    pub(crate) stream_id: u8,
    pub(crate) language: Option<[u8; 3]>,
    pub(crate) dvb_au: bool,
    pub(crate) descriptors: Vec<Descriptor>,
    pub(crate) cc: ContinuityCounter,
    pub(crate) rx: f64,
    pub(crate) rbx: f64,
    pub(crate) tb: LeakyBuffer,
    pub(crate) mb: LeakyBuffer,
    pub(crate) eb: LeakyBuffer,
    pub(crate) codec: CodecContext,
    pub(crate) queue: VecDeque<PESPacket>,
}

impl Stream {
    pub(crate) fn from_config(cfg: &StreamConfig) -> Self {
        let mut stream = Self {
            pid: cfg.pid,
            format: cfg.format,
            stream_id: cfg.stream_id.unwrap_or_else(|| cfg.format.default_stream_id()),
            language: cfg.language,
            dvb_au: cfg.dvb_au,
            descriptors: cfg.descriptors.clone(),
            cc: ContinuityCounter::default(),
            rx: 0.0,
            rbx: 0.0,
            tb: LeakyBuffer::default(),
            mb: LeakyBuffer::default(),
            eb: LeakyBuffer::default(),
            codec: CodecContext::None,
            queue: VecDeque::new(),
        };
        stream.apply_timing(&default_timing(cfg.format));
        stream
    }

    pub(crate) fn apply_timing(&mut self, timing: &StreamTiming) {
        self.rx = timing.rx;
        self.rbx = timing.rbx;
        self.tb.set_size(timing.tb_size);
        self.mb.set_size(timing.mb_size);
        self.eb.set_size(timing.eb_size);
    }

    pub(crate) fn pes_info(&self) -> PesStreamInfo {
        PesStreamInfo {
            pid: self.pid,
            stream_id: self.stream_id,
            format: self.format,
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn stream_id(&self) -> u8 {
        self.stream_id
    }

    /// Nominal leak rate out of the transport buffer, bits/s.
    pub fn rx(&self) -> f64 {
        self.rx
    }

    /// Peak rate out of the multiplex buffer, bits/s.
    pub fn rbx(&self) -> f64 {
        self.rbx
    }

    pub fn tb(&self) -> &LeakyBuffer {
        &self.tb
    }

    pub fn mb(&self) -> &LeakyBuffer {
        &self.mb
    }

    pub fn eb(&self) -> &LeakyBuffer {
        &self.eb
    }

    pub fn codec(&self) -> &CodecContext {
        &self.codec
    }

    pub fn continuity_counter(&self) -> u8 {
        self.cc.value()
    }

    /// Bytes of PES data waiting to be sent.
    pub fn pending_bytes(&self) -> usize {
        self.queue.iter().map(PESPacket::bytes_left).sum()
    }

    /// DTS of the PES packet at the head of the queue.
    pub(crate) fn next_dts(&self) -> Option<u64> {
        self.queue.front().map(|pes| pes.dts)
    }
}

/// Timing a stream starts with before any codec setup.
fn default_timing(format: StreamFormat) -> StreamTiming {
    match format {
        StreamFormat::Mpeg2Video => mpeg2::lookup(mpeg2::Mpeg2Level::Main, mpeg2::Mpeg2Profile::Main)
            .map(|l| StreamTiming::mpeg2(l, l.bitrate, l.vbv))
            .unwrap_or_else(StreamTiming::generic),
        StreamFormat::H264Video => h264::lookup(40)
            .map(StreamTiming::h264)
            .unwrap_or_else(StreamTiming::generic),
        _ => StreamTiming::generic(),
    }
}

/// A program: its PMT, PCR carriage and streams.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) program_number: u16,
    pub(crate) pmt_pid: u16,
    pub(crate) pmt_cc: ContinuityCounter,
    pub(crate) pcr_pid: u16,
    /// Index of the stream on the PCR PID, if it is one of ours
    pub(crate) pcr_stream: Option<usize>,
    pub(crate) smoothing_buffer: Option<SmoothingBuffer>,
    pub(crate) clock: ProgramClock,
    pub(crate) streams: Vec<Stream>,
}

impl Program {
    pub(crate) fn from_config(cfg: &ProgramConfig) -> Self {
        let streams: Vec<Stream> = cfg.streams.iter().map(Stream::from_config).collect();
        let pcr_stream = streams.iter().position(|s| s.pid == cfg.pcr_pid);
        Self {
            program_number: cfg.program_number,
            pmt_pid: cfg.pmt_pid,
            pmt_cc: ContinuityCounter::default(),
            pcr_pid: cfg.pcr_pid,
            pcr_stream,
            smoothing_buffer: cfg.smoothing_buffer,
            clock: ProgramClock::default(),
            streams,
        }
    }

    pub fn program_number(&self) -> u16 {
        self.program_number
    }

    pub fn pmt_pid(&self) -> u16 {
        self.pmt_pid
    }

    pub fn pcr_pid(&self) -> u16 {
        self.pcr_pid
    }

    pub fn clock(&self) -> &ProgramClock {
        &self.clock
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn stream(&self, pid: u16) -> Option<&Stream> {
        self.streams.iter().find(|s| s.pid == pid)
    }

    pub(crate) fn stream_mut(&mut self, pid: u16) -> Option<&mut Stream> {
        self.streams.iter_mut().find(|s| s.pid == pid)
    }
}
