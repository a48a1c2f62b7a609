//! # MPEG Transport Stream (TS) multiplexing
//!
//! This module turns timestamped access units into a constant rate MPEG-2
//! transport stream (ISO/IEC 13818-1):
//!
//! - PES packetization of access units
//! - PAT/PMT generation with CRC-32 and descriptors
//! - T-STD transport buffer modelling that gates payload emission
//! - PCR scheduling, PCR-only and null packets
//!
//! ## Example Usage
//!
//! ```rust
//! use tsmux::av::Frame;
//! use tsmux::config::{ProgramConfig, StreamConfig, WriterConfig};
//! use tsmux::format::ts::{PacketKind, StreamFormat, TsType, TsWriter, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WriterConfig::new(TsType::Generic, 5_000_000).with_program(
//!     ProgramConfig::new(1, 0x1000, 0x100)
//!         .with_stream(StreamConfig::new(0x100, StreamFormat::H264Video)),
//! );
//! let mut writer = TsWriter::new(config)?;
//! writer.setup_mpegvideo_stream(0x100, 40, 3, 5_000_000, 5_000_000, 25.0)?;
//!
//! writer.push_frame(Frame::new(0x100, vec![0u8; 5000]).with_timestamp(90_000))?;
//! let packets = writer.drain()?;
//! assert_eq!(packets[0].kind, PacketKind::Pat);
//! assert!(packets.iter().all(|p| p.data.len() == TS_PACKET_SIZE));
//! # Ok(())
//! # }
//! ```

/// Adaptation field encoding
pub mod adaptation;

/// Leaky bucket buffers of the T-STD
pub mod buffer;

/// Program clock and PCR stamping
pub mod clock;

/// PMT descriptors
pub mod descriptors;

/// Async output sink
pub mod muxer;

/// PES packet handling
pub mod pes;

/// PAT and PMT sections
pub mod psi;

/// Programs and elementary streams
pub mod stream;

/// Core TS types and constants
pub mod types;

/// Packet scheduler
pub mod writer;

#[cfg(test)]
mod tests;

// Re-export commonly used types and constants
pub use adaptation::AdaptationField;
pub use buffer::LeakyBuffer;
pub use clock::ProgramClock;
pub use muxer::TsSink;
pub use pes::{read_timestamp, PESHeader, PESPacket};
pub use psi::{PatSection, PmtSection};
pub use stream::{Program, Stream};
pub use types::{
    Descriptor, StreamFormat, TSHeader, TsType, PID_NULL, PID_PAT, TS_PACKET_SIZE,
};
pub use writer::{PacketKind, TsPacket, TsWriter};
