use super::*;
use crate::av::Frame;
use crate::codec::mpeg2::{
    MPEG2_LEVEL_HIGH, MPEG2_LEVEL_LOW, MPEG2_LEVEL_MAIN, MPEG2_PROFILE_HIGH, MPEG2_PROFILE_MAIN,
};
use crate::codec::CodecContext;
use crate::config::{ProgramConfig, StreamConfig, WriterConfig};
use crate::error::MuxError;
use pretty_assertions::assert_eq;
use std::sync::Mutex;

const VIDEO: u16 = 0x100;
const AUDIO: u16 = 0x101;
const AES3: u16 = 0x102;

fn config(ts_type: TsType) -> WriterConfig {
    WriterConfig::new(ts_type, 1_504_000).with_program(
        ProgramConfig::new(1, 0x30, VIDEO)
            .with_stream(StreamConfig::new(VIDEO, StreamFormat::Mpeg2Video))
            .with_stream(StreamConfig::new(AUDIO, StreamFormat::Mpeg2Audio))
            .with_stream(StreamConfig::new(AES3, StreamFormat::Smpte302mAudio)),
    )
}

fn writer() -> TsWriter {
    TsWriter::new(config(TsType::Generic)).unwrap()
}

/// Collects warnings so tests can check that anomalies get logged.
struct WarningLog;

static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static WARNING_LOG: WarningLog = WarningLog;

impl log::Log for WarningLog {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut warnings) = WARNINGS.lock() {
                warnings.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

fn capture_warnings() {
    // another test may have installed it already
    let _ = log::set_logger(&WARNING_LOG);
    log::set_max_level(log::LevelFilter::Warn);
}

fn warned(needle: &str) -> bool {
    WARNINGS
        .lock()
        .map(|w| w.iter().any(|m| m.contains(needle)))
        .unwrap_or(false)
}

#[test]
fn test_mpeg2_main_at_main_setup() {
    let mut w = writer();
    w.setup_mpegvideo_stream(
        VIDEO,
        MPEG2_LEVEL_MAIN,
        MPEG2_PROFILE_MAIN,
        15_000_000,
        1_835_008,
        25.0,
    )
    .unwrap();

    let stream = w.stream(VIDEO).unwrap();
    assert_eq!(stream.eb().size(), 1_835_008);
    assert_eq!(stream.rbx(), 15_000_000.0);
    assert_eq!(stream.tb().size(), 4096);
    let ctx = stream.codec().video().unwrap();
    assert_eq!(ctx.frame_rate_code, 3);
    assert!((ctx.buffer_size - 1_835_008.0 / 15_000_000.0).abs() < 1e-12);
}

#[test]
fn test_setup_is_idempotent() {
    let mut w = writer();
    for _ in 0..2 {
        w.setup_mpegvideo_stream(VIDEO, MPEG2_LEVEL_HIGH, MPEG2_PROFILE_MAIN, 20_000_000, 9_781_248, 50.0)
            .unwrap();
    }
    let stream = w.stream(VIDEO).unwrap();
    assert!((stream.rbx() - 21_000_000.0).abs() < 1e-3);
    assert_eq!(stream.eb().size(), 9_781_248);
}

#[test]
fn test_low_level_high_profile_is_rejected() {
    let mut w = writer();
    let err = w
        .setup_mpegvideo_stream(
            VIDEO,
            MPEG2_LEVEL_LOW,
            MPEG2_PROFILE_HIGH,
            4_000_000,
            475_136,
            25.0,
        )
        .unwrap_err();
    assert!(matches!(err, MuxError::InvalidLevelProfile { .. }));
    assert_eq!(*w.stream(VIDEO).unwrap().codec(), CodecContext::None);
}

#[test]
fn test_302m_setup() {
    let mut w = writer();
    assert!(matches!(
        w.setup_302m_stream(AES3, 18, 2),
        Err(MuxError::InvalidBitDepth(18))
    ));
    assert!(matches!(
        w.setup_302m_stream(AES3, 24, 3),
        Err(MuxError::InvalidChannelCount(3))
    ));
    assert!(matches!(
        w.setup_302m_stream(AUDIO, 24, 2),
        Err(MuxError::NotLpcmStream(AUDIO))
    ));
    assert!(matches!(
        w.setup_302m_stream(0x1ff, 24, 2),
        Err(MuxError::InvalidPid(0x1ff))
    ));
    assert!(w.stream(AES3).unwrap().codec().is_none());

    w.setup_302m_stream(AES3, 24, 8).unwrap();
    let stream = w.stream(AES3).unwrap();
    assert!((stream.rx() - 1.2 * 7.0 * 48_000.0 * 8.0).abs() < 1e-6);
    assert_eq!(stream.eb().size(), 65_024 * 8);
    assert_eq!(stream.codec().lpcm().unwrap().num_channels, 8);
}

#[test]
fn test_302m_not_allowed_in_bluray() {
    let mut w = TsWriter::new(config(TsType::BluRay)).unwrap();
    assert!(matches!(
        w.setup_302m_stream(AES3, 16, 2),
        Err(MuxError::DisallowedForProfile(_))
    ));
}

#[test]
fn test_h264_accepts_frame_rates_without_mpeg2_code() {
    let config = WriterConfig::new(TsType::Generic, 10_000_000).with_program(
        ProgramConfig::new(1, 0x30, 0x40).with_stream(StreamConfig::new(0x40, StreamFormat::H264Video)),
    );
    let mut w = TsWriter::new(config).unwrap();
    for frame_rate in [12.5, 48.0, 120.0] {
        w.setup_mpegvideo_stream(0x40, 40, 3, 5_000_000, 5_000_000, frame_rate)
            .unwrap();
    }
    let ctx = w.stream(0x40).unwrap().codec().video().unwrap();
    assert_eq!(ctx.frame_rate_code, 0);

    // MPEG-2 still needs a code for its video stream descriptor
    let mut w = writer();
    assert!(matches!(
        w.setup_mpegvideo_stream(VIDEO, MPEG2_LEVEL_MAIN, MPEG2_PROFILE_MAIN, 15_000_000, 1_835_008, 12.5),
        Err(MuxError::InvalidFrameRate(_))
    ));
}

#[test]
fn test_clock_restart_flags_pcr_discontinuity() {
    let mut w = writer();
    let mut packets = Vec::new();
    for _ in 0..3 {
        packets.push(w.next_packet().unwrap());
    }
    w.push_frame(Frame::new(VIDEO, vec![0; 2_000]).with_timestamp(900_000))
        .unwrap();
    packets.extend(w.drain().unwrap());

    let pcr_flags: Vec<u8> = packets
        .iter()
        .filter(|p| p.has_pcr())
        .map(|p| p.as_bytes()[5])
        .collect();
    assert!(pcr_flags.len() >= 2);
    // PCR before the restart, then the first one after it
    assert_eq!(pcr_flags[0] & 0x80, 0);
    assert_eq!(pcr_flags[1] & 0x80, 0x80);
    assert!(pcr_flags[2..].iter().all(|f| f & 0x80 == 0));
}

#[test]
fn test_pcr_pid_of_another_programs_stream_is_rejected() {
    let config = WriterConfig::new(TsType::Generic, 2_000_000)
        .with_program(
            ProgramConfig::new(1, 0x20, 0x101)
                .with_stream(StreamConfig::new(0x101, StreamFormat::Mpeg2Audio)),
        )
        .with_program(
            ProgramConfig::new(2, 0x30, 0x101)
                .with_stream(StreamConfig::new(0x201, StreamFormat::Mpeg2Audio)),
        );
    assert!(matches!(TsWriter::new(config), Err(MuxError::InvalidPid(0x101))));
}

#[test]
fn test_scheduling_follows_dts_across_wrap() {
    let config = WriterConfig::new(TsType::Generic, 1_504_000).with_program(
        ProgramConfig::new(1, 0x30, 0x50)
            .with_stream(StreamConfig::new(AUDIO, StreamFormat::Mpeg2Audio))
            .with_stream(StreamConfig::new(AES3, StreamFormat::Mpeg2Audio)),
    );
    let mut w = TsWriter::new(config).unwrap();
    w.push_frame(Frame::new(AUDIO, vec![1; 100]).with_timestamp(types::TIMESTAMP_MODULUS - 1_800))
        .unwrap();
    // 40 ms later, past the 33-bit wrap
    w.push_frame(Frame::new(AES3, vec![2; 100]).with_timestamp(1_800))
        .unwrap();
    let packets = w.drain().unwrap();

    let order: Vec<u16> = packets
        .iter()
        .filter(|p| p.kind == PacketKind::Pes)
        .map(|p| p.pid)
        .collect();
    assert_eq!(order, vec![AUDIO, AES3]);
}

#[test]
fn test_dts_after_pts_is_still_written() {
    capture_warnings();
    let mut w = writer();
    w.push_frame(
        Frame::new(AUDIO, vec![0x5a; 100])
            .with_pts(89_000)
            .with_dts(90_000),
    )
    .unwrap();
    let packets = w.drain().unwrap();
    let pes = packets.iter().find(|p| p.kind == PacketKind::Pes).unwrap();

    let data = pes.as_bytes();
    // 100 + 19 byte PES leaves 65 bytes of adaptation field
    let payload = &data[4 + 1 + data[4] as usize..];
    let header = PESHeader::parse(payload).unwrap();
    assert_eq!(header.pts, Some(89_000));
    assert_eq!(header.dts, Some(90_000));
    assert_eq!(header.packet_length as usize, 3 + 10 + 100);
    assert_eq!(&payload[header.header_len()..], &[0x5a; 100][..]);
    assert!(warned("PID 0x0101: DTS 90000 > PTS 89000"));
}

#[test]
fn test_pcr_only_packet_advances_clock() {
    let mut w = writer();
    w.next_packet().unwrap(); // PAT
    w.next_packet().unwrap(); // PMT
    let before = w.programs()[0].clock().cur_pcr();
    let packet = w.next_packet().unwrap();
    let after = w.programs()[0].clock().cur_pcr();

    assert_eq!(packet.kind, PacketKind::PcrOnly);
    assert_eq!(packet.pid, VIDEO);
    assert!(packet.has_pcr());
    let data = packet.as_bytes();
    assert_eq!((data[3] >> 4) & 0x3, 0b10);
    assert_eq!(data[4], 183);
    assert_eq!(data[3] & 0x0f, 0);
    assert!((after - before - w.packet_time()).abs() < 1e-12);
    assert_eq!(w.programs()[0].clock().last_pcr(), Some((before * 27e6) as u64));
}

#[test]
fn test_pcr_rides_on_video_payload() {
    let mut w = writer();
    w.push_frame(Frame::new(VIDEO, vec![0; 10_000]).with_timestamp(90_000))
        .unwrap();
    let packets = w.write_until(0.55).unwrap();
    let video: Vec<&TsPacket> = packets.iter().filter(|p| p.pid == VIDEO).collect();
    assert!(video.iter().all(|p| p.kind == PacketKind::Pes));
    assert!(video[0].has_pcr());
    assert!(video.iter().filter(|p| p.has_pcr()).count() >= 2);
}

#[test]
fn test_continuity_counters() {
    let mut w = writer();
    for i in 0..40u64 {
        w.push_frame(Frame::new(AUDIO, vec![i as u8; 500]).with_timestamp(90_000 + i * 2_160))
            .unwrap();
    }
    let packets = w.drain().unwrap();

    let audio_cc: Vec<u8> = packets
        .iter()
        .filter(|p| p.pid == AUDIO)
        .map(|p| p.as_bytes()[3] & 0x0f)
        .collect();
    assert!(audio_cc.len() > 16);
    for pair in audio_cc.windows(2) {
        assert_eq!(pair[1], (pair[0] + 1) & 0x0f);
    }
    assert!(packets
        .iter()
        .filter(|p| p.kind == PacketKind::Null)
        .all(|p| p.as_bytes()[3] & 0x0f == 0));
}

#[test]
fn test_every_packet_is_188_bytes() {
    let mut w = writer();
    w.setup_302m_stream(AES3, 16, 2).unwrap();
    for i in 0..20u64 {
        let ts = 90_000 + i * 3_600;
        w.push_frame(Frame::new(VIDEO, vec![1; 3_000]).with_pts(ts + 3_600).with_dts(ts))
            .unwrap();
        w.push_frame(Frame::new(AUDIO, vec![2; 576]).with_timestamp(ts))
            .unwrap();
        w.push_frame(Frame::new(AES3, vec![3; 1_000]).with_timestamp(ts))
            .unwrap();
    }
    let packets = w.drain().unwrap();
    assert!(packets
        .iter()
        .all(|p| p.data.len() == TS_PACKET_SIZE && p.data[0] == 0x47));
    for stream in w.programs()[0].streams() {
        assert!(stream.tb().fill() <= stream.tb().size());
    }
}

#[test]
fn test_pat_with_two_programs() {
    let config = WriterConfig::new(TsType::Dvb, 2_000_000)
        .with_transport_stream_id(0x1234)
        .with_network_pid(0x10)
        .with_program(
            ProgramConfig::new(1, 0x100, 0x101)
                .with_stream(StreamConfig::new(0x101, StreamFormat::H264Video)),
        )
        .with_program(
            ProgramConfig::new(2, 0x200, 0x201)
                .with_stream(StreamConfig::new(0x201, StreamFormat::Ac3Audio)),
        );
    let mut w = TsWriter::new(config).unwrap();

    let pat = w.next_packet().unwrap();
    let parsed = PatSection::parse(&pat.data[4..]).unwrap();
    assert!(parsed.crc_valid);
    assert_eq!(parsed.transport_stream_id, 0x1234);
    assert_eq!(parsed.network_pid, Some(0x10));
    assert_eq!(parsed.programs, vec![(1, 0x100), (2, 0x200)]);

    let pmt1 = w.next_packet().unwrap();
    let pmt2 = w.next_packet().unwrap();
    assert_eq!((pmt1.pid, pmt2.pid), (0x100, 0x200));
    let pmt2 = PmtSection::parse(&pmt2.data[4..]).unwrap();
    assert_eq!(pmt2.streams[0].stream_type, 0x06);
    assert_eq!(pmt2.streams[0].descriptors[0].tag, 0x6a);
}

#[test]
fn test_bluray_program_registration() {
    let mut w = TsWriter::new(config(TsType::BluRay)).unwrap();
    w.next_packet().unwrap();
    let pmt = w.next_packet().unwrap();
    let parsed = PmtSection::parse(&pmt.data[4..]).unwrap();
    assert_eq!(parsed.program_descriptors[0].data, b"HDMV".to_vec());
}

#[test]
fn test_dvb_au_information_on_first_packet() {
    let config = WriterConfig::new(TsType::Dvb, 10_000_000).with_program(
        ProgramConfig::new(1, 0x30, 0x31)
            .with_stream(StreamConfig::new(0x40, StreamFormat::H264Video).with_dvb_au(true)),
    );
    let mut w = TsWriter::new(config).unwrap();
    w.push_frame(Frame::new(0x40, vec![0; 1_000]).with_timestamp(180_000))
        .unwrap();
    let packets = w.drain().unwrap();
    let first = packets.iter().find(|p| p.pid == 0x40).unwrap().as_bytes();

    assert_eq!(first[5] & 0x02, 0x02);
    // flags, then private data length and the AU_information field
    assert_eq!(first[6], 8);
    assert_eq!(&first[7..9], &[0x02, 0x06]);
    assert_eq!(first[9] >> 4, 0x2);
    assert_eq!(&first[11..15], &180_000u32.to_be_bytes());
}
