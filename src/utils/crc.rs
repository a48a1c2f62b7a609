//! CRC-32/MPEG-2 as used by PSI sections (ITU-T H.222.0 / ISO/IEC 13818-1).
//!
//! Polynomial: x32 + x26 + x23 + x22 + x16 + x12 + x11 + x10 + x8 + x7 + x5 + x4 + x2 + x + 1,
//! initial value 0xFFFFFFFF, no reflection, no final XOR.

const CRC32_MPEG2: u32 = 0x04C11DB7;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC32_MPEG2
            } else {
                crc << 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// MPEG-2 CRC32 calculator for PSI sections.
pub struct Crc32Mpeg2;

impl Crc32Mpeg2 {
    /// Calculates the CRC32 of `data`.
    ///
    /// ```
    /// use tsmux::utils::Crc32Mpeg2;
    ///
    /// assert_eq!(Crc32Mpeg2::calculate(&[0x01, 0x01]), 0xD66FB816);
    /// ```
    pub fn calculate(data: &[u8]) -> u32 {
        data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
            (crc << 8) ^ TABLE[(((crc >> 24) ^ byte as u32) & 0xFF) as usize]
        })
    }

    /// Checks a section that ends with its own CRC32 field.
    ///
    /// Running the CRC over a section including a correct trailer yields zero.
    pub fn verify(section_with_crc: &[u8]) -> bool {
        section_with_crc.len() >= 4 && Self::calculate(section_with_crc) == 0
    }
}
