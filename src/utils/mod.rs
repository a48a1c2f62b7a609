//! # Utility Functions and Types
//!
//! Bit-level writing and reading plus the MPEG-2 CRC32 used by PSI sections.
//!
//! ## Bit Operations
//!
//! ```rust
//! use tsmux::utils::{BitReader, BitWriter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = BitWriter::with_capacity(4);
//! writer.write_bits(13, 0x1FFF)?;
//! writer.write_bits(3, 0b111)?;
//! let bytes = writer.into_bytes();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_bits(13)?, 0x1FFF);
//! # Ok(())
//! # }
//! ```
//!
//! ## CRC Calculation
//!
//! ```rust
//! use tsmux::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::calculate(b"Hello, world!");
//! println!("CRC32: {:08x}", crc);
//! ```

/// Bit-granular writer and reader
pub mod bits;

/// CRC calculation implementations
pub mod crc;

pub use bits::{BitReader, BitWriter};
pub use crc::Crc32Mpeg2;
