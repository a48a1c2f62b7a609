#![doc(html_root_url = "https://docs.rs/tsmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsmux - MPEG transport stream multiplexer
//!
//! `tsmux` turns timestamped access units into a constant rate MPEG-2
//! transport stream (ISO/IEC 13818-1) for broadcast, Blu-ray or generic
//! delivery. The multiplexer models the transport buffers of the T-STD, so
//! payload is only sent when a decoder could accept it, and pads the stream
//! with PCR-only and null packets.
//!
//! ## Features
//!
//! - PES packetization with PTS/DTS
//! - PAT and PMT generation with CRC-32 and descriptors
//! - MPEG-2 and H.264 level/profile tables driving the buffer model
//! - SMPTE 302M audio setup
//! - PCR scheduling at a configurable period
//! - DVB, ATSC, CableLabs, ISDB and Blu-ray stream type mapping
//!
//! ## Quick Start
//!
//! ```rust
//! use tsmux::av::Frame;
//! use tsmux::config::{ProgramConfig, StreamConfig, WriterConfig};
//! use tsmux::format::ts::{StreamFormat, TsType, TsWriter};
//!
//! # fn main() -> tsmux::Result<()> {
//! let config = WriterConfig::new(TsType::Dvb, 8_000_000).with_program(
//!     ProgramConfig::new(1, 0x100, 0x101)
//!         .with_stream(StreamConfig::new(0x101, StreamFormat::Mpeg2Video))
//!         .with_stream(StreamConfig::new(0x102, StreamFormat::Mpeg2Audio).with_language(*b"eng")),
//! );
//! let mut writer = TsWriter::new(config)?;
//! writer.setup_mpegvideo_stream(0x101, 1, 1, 6_000_000, 1_835_008, 25.0)?;
//!
//! writer.push_frame(Frame::new(0x101, vec![0u8; 20_000]).with_pts(93_600).with_dts(90_000))?;
//! writer.push_frame(Frame::new(0x102, vec![0u8; 576]).with_timestamp(90_000))?;
//!
//! let mut output = Vec::new();
//! for packet in writer.drain()? {
//!     output.extend_from_slice(packet.as_bytes());
//! }
//! assert_eq!(output.len() % 188, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: access units handed to the muxer
//! - `codec`: MPEG-2, H.264 and SMPTE 302M parameter tables
//! - `config`: writer, program and stream configuration
//! - `format`: the transport stream writer and its async sink
//! - `error`: error type and result alias
//! - `utils`: bit writer/reader and CRC-32/MPEG-2
//!
/// Access units
pub mod av;

/// Codec parameter tables
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Transport stream multiplexing
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use error::{MuxError, Result};
