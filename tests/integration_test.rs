#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::collections::HashMap;
    use tsmux::av::Frame;
    use tsmux::config::{create_default_config_template, ProgramConfig, StreamConfig, WriterConfig};
    use tsmux::error::Result;
    use tsmux::format::ts::{
        read_timestamp, PESHeader, PacketKind, PatSection, PmtSection, StreamFormat, TsPacket, TsSink,
        TsType, TsWriter, PID_NULL, TS_PACKET_SIZE,
    };
    use tsmux::format::Muxer;

    const PMT_PID: u16 = 0x1000;
    const VIDEO_PID: u16 = 0x100;
    const AUDIO_PID: u16 = 0x101;

    fn broadcast_config() -> WriterConfig {
        WriterConfig::new(TsType::Atsc, 4_000_000)
            .with_transport_stream_id(7)
            .with_program(
                ProgramConfig::new(1, PMT_PID, VIDEO_PID)
                    .with_stream(StreamConfig::new(VIDEO_PID, StreamFormat::H264Video))
                    .with_stream(
                        StreamConfig::new(AUDIO_PID, StreamFormat::Ac3Audio).with_language(*b"eng"),
                    ),
            )
    }

    /// Packet header fields a receiver looks at.
    struct Header {
        pid: u16,
        pusi: bool,
        has_adaptation: bool,
        has_payload: bool,
        cc: u8,
    }

    fn header(packet: &[u8]) -> Header {
        Header {
            pid: u16::from_be_bytes([packet[1], packet[2]]) & 0x1fff,
            pusi: packet[1] & 0x40 != 0,
            has_adaptation: packet[3] & 0x20 != 0,
            has_payload: packet[3] & 0x10 != 0,
            cc: packet[3] & 0x0f,
        }
    }

    fn payload(packet: &[u8]) -> &[u8] {
        let h = header(packet);
        let start = if h.has_adaptation { 5 + packet[4] as usize } else { 4 };
        if h.has_payload {
            &packet[start..]
        } else {
            &[]
        }
    }

    fn pcr_of(packet: &[u8]) -> Option<u64> {
        let h = header(packet);
        if !h.has_adaptation || packet[4] == 0 || packet[5] & 0x10 == 0 {
            return None;
        }
        let p = &packet[6..12];
        let base = (u64::from(p[0]) << 25)
            | (u64::from(p[1]) << 17)
            | (u64::from(p[2]) << 9)
            | (u64::from(p[3]) << 1)
            | (u64::from(p[4]) >> 7);
        let ext = (u64::from(p[4] & 0x01) << 8) | u64::from(p[5]);
        Some(base * 300 + ext)
    }

    /// Reassembles the PES packets of one PID.
    fn pes_packets(stream: &[u8], pid: u16) -> Vec<Bytes> {
        let mut out = Vec::new();
        let mut current: Option<BytesMut> = None;
        for packet in stream.chunks(TS_PACKET_SIZE) {
            let h = header(packet);
            if h.pid != pid || !h.has_payload {
                continue;
            }
            if h.pusi {
                if let Some(done) = current.take() {
                    out.push(done.freeze());
                }
                current = Some(BytesMut::new());
            }
            if let Some(buf) = current.as_mut() {
                buf.extend_from_slice(payload(packet));
            }
        }
        if let Some(done) = current {
            out.push(done.freeze());
        }
        out
    }

    fn frames() -> Vec<Frame> {
        let mut frames = Vec::new();
        for i in 0..25u64 {
            let dts = 90_000 + i * 3_600;
            let video = Frame::new(VIDEO_PID, vec![(i & 0xff) as u8; 6_000 + (i as usize % 5) * 700])
                .with_pts(dts + 7_200)
                .with_dts(dts)
                .with_random_access(i % 12 == 0);
            frames.push(video);
            frames.push(Frame::new(AUDIO_PID, vec![0xa0 | (i & 0x0f) as u8; 768]).with_timestamp(dts));
        }
        frames
    }

    async fn mux(frames: Vec<Frame>) -> Result<Vec<u8>> {
        let mut writer = TsWriter::new(broadcast_config())?;
        writer.setup_mpegvideo_stream(VIDEO_PID, 40, 3, 2_500_000, 2_500_000, 25.0)?;
        let mut sink = TsSink::new(writer, Vec::new());
        sink.write_header().await?;
        for frame in frames {
            sink.write_frame(frame).await?;
        }
        sink.write_trailer().await?;
        sink.into_inner().await
    }

    #[tokio::test]
    async fn test_end_to_end_stream_structure() -> Result<()> {
        let out = mux(frames()).await?;
        assert_eq!(out.len() % TS_PACKET_SIZE, 0);
        assert!(out.chunks(TS_PACKET_SIZE).all(|p| p[0] == 0x47));

        // PAT first, then the PMT
        let first = out.chunks(TS_PACKET_SIZE).next().unwrap();
        let pat = PatSection::parse(payload(first))?;
        assert!(pat.crc_valid);
        assert_eq!(pat.transport_stream_id, 7);
        assert_eq!(pat.programs, vec![(1, PMT_PID)]);

        let pmt_packet = out
            .chunks(TS_PACKET_SIZE)
            .find(|p| header(p).pid == PMT_PID)
            .unwrap();
        let pmt = PmtSection::parse(payload(pmt_packet))?;
        assert!(pmt.crc_valid);
        assert_eq!(pmt.pcr_pid, VIDEO_PID);
        let types: Vec<(u8, u16)> = pmt.streams.iter().map(|s| (s.stream_type, s.pid)).collect();
        assert_eq!(types, vec![(0x1b, VIDEO_PID), (0x81, AUDIO_PID)]);
        // AVC descriptor carries High profile at level 4.0
        let avc = pmt.streams[0].descriptors.iter().find(|d| d.tag == 0x28).unwrap();
        assert_eq!((avc.data[0], avc.data[2]), (100, 40));
        assert!(pmt.streams[1].descriptors.iter().any(|d| d.tag == 0x0a));
        Ok(())
    }

    #[tokio::test]
    async fn test_continuity_counters_per_pid() -> Result<()> {
        let out = mux(frames()).await?;
        let mut last: HashMap<u16, u8> = HashMap::new();
        for packet in out.chunks(TS_PACKET_SIZE) {
            let h = header(packet);
            if h.pid == PID_NULL {
                assert_eq!(h.cc, 0);
                continue;
            }
            let expected = match last.get(&h.pid) {
                Some(&prev) if h.has_payload => (prev + 1) & 0x0f,
                Some(&prev) => prev,
                None if h.has_payload => 1,
                None => 0,
            };
            assert_eq!(h.cc, expected, "PID {:#06x}", h.pid);
            last.insert(h.pid, h.cc);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_pes_payloads_and_timestamps_survive() -> Result<()> {
        let input = frames();
        let out = mux(input.clone()).await?;

        for pid in [VIDEO_PID, AUDIO_PID] {
            let sent: Vec<&Frame> = input.iter().filter(|f| f.pid == pid).collect();
            let received = pes_packets(&out, pid);
            assert_eq!(received.len(), sent.len());
            for (frame, pes) in sent.iter().zip(&received) {
                let header = PESHeader::parse(pes)?;
                assert_eq!(header.pts, Some(frame.pts));
                let dts = if frame.dts == frame.pts { None } else { Some(frame.dts) };
                assert_eq!(header.dts, dts);
                assert_eq!(&pes[header.header_len()..], &frame.data[..]);
                assert_eq!(read_timestamp(&pes[9..14])?, frame.pts);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_pcr_cadence() -> Result<()> {
        let out = mux(frames()).await?;
        let pcrs: Vec<u64> = out.chunks(TS_PACKET_SIZE).filter_map(pcr_of).collect();
        assert!(pcrs.len() > 10);

        // 35 ms period, plus a packet of slack and a PAT/PMT pair that may
        // go first, in 27 MHz ticks
        let packet_ticks = 27_000_000 * 188 * 8 / 4_000_000;
        let max_gap = 27_000 * 35 + 3 * packet_ticks + 1;
        for pair in pcrs.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(pair[1] - pair[0] <= max_gap, "gap {}", pair[1] - pair[0]);
        }
        Ok(())
    }

    #[test]
    fn test_random_access_flag_on_key_frames() {
        tokio_test::block_on(async {
            let out = mux(frames()).await.unwrap();
            let flagged = out
                .chunks(TS_PACKET_SIZE)
                .filter(|p| {
                    let h = header(p);
                    h.pid == VIDEO_PID && h.pusi && h.has_adaptation && p[4] > 0 && p[5] & 0x40 != 0
                })
                .count();
            // frames 0, 12 and 24
            assert_eq!(flagged, 3);
        });
    }

    #[test]
    fn test_writer_from_config_file() {
        let dir = std::env::temp_dir().join(format!("tsmux-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tsmux.conf");
        let _ = std::fs::remove_file(&path);
        create_default_config_template(&path).unwrap();
        std::fs::write(&path, std::fs::read_to_string(&path).unwrap() + "mux_rate = 3008000\n").unwrap();

        let mut config = broadcast_config();
        config.apply_file(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(config.mux_rate, 3_008_000);
        assert_eq!(config.ts_type, TsType::Generic);
        let writer = TsWriter::new(config).unwrap();
        assert!((writer.packet_time() - 0.0005).abs() < 1e-12);
    }

    #[quickcheck]
    fn prop_any_frame_sizes_round_trip(sizes: Vec<u16>) -> bool {
        let config = WriterConfig::new(TsType::Generic, 6_000_000).with_program(
            ProgramConfig::new(1, 0x20, 0x21)
                .with_stream(StreamConfig::new(0x21, StreamFormat::Mpeg2Audio)),
        );
        let mut writer = match TsWriter::new(config) {
            Ok(w) => w,
            Err(_) => return false,
        };
        let frames: Vec<Frame> = sizes
            .iter()
            .take(30)
            .enumerate()
            .map(|(i, &size)| {
                let len = 1 + size as usize % 4_000;
                Frame::new(0x21, vec![(i % 251) as u8; len]).with_timestamp(90_000 + i as u64 * 2_160)
            })
            .collect();
        if frames.is_empty() {
            return true;
        }
        for frame in &frames {
            if writer.push_frame(frame.clone()).is_err() {
                return false;
            }
        }
        let packets: Vec<TsPacket> = match writer.drain() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if packets.iter().any(|p| p.data.len() != TS_PACKET_SIZE) {
            return false;
        }
        if packets.iter().filter(|p| p.kind == PacketKind::Pat).count() == 0 {
            return false;
        }

        let stream: Vec<u8> = packets.iter().flat_map(|p| p.data.iter().copied()).collect();
        let received = pes_packets(&stream, 0x21);
        received.len() == frames.len()
            && received.iter().zip(&frames).all(|(pes, frame)| {
                PESHeader::parse(pes)
                    .map(|h| pes[h.header_len()..] == frame.data[..])
                    .unwrap_or(false)
            })
    }
}
