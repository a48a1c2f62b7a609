use crate::error::{MuxError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// A bit-level writer producing MSB-first binary data.
///
/// The writer is bounded: it is created with a byte capacity and any write
/// that would go past it fails with [`MuxError::BitstreamOverflow`]. Callers
/// size scratch writers for the worst case of what they encode.
///
/// Fields whose value is only known after the body has been written (section
/// lengths, adaptation field lengths, CRCs) are reserved first and patched in
/// with [`BitWriter::patch_bits`] once the body is complete.
///
/// Example:
/// ```
/// use tsmux::utils::BitWriter;
///
/// let mut writer = BitWriter::with_capacity(2);
/// writer.write_bits(3, 0b101).unwrap();
/// writer.write_bit(true).unwrap();
/// writer.write_bits(4, 0b0011).unwrap();
/// assert_eq!(writer.as_bytes(), &[0b1011_0011]);
/// ```
#[derive(Debug)]
pub struct BitWriter {
    data: BytesMut,
    capacity: usize,
    acc: u8,
    acc_bits: u8,
}

impl BitWriter {
    /// Creates a writer that accepts at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        BitWriter {
            data: BytesMut::with_capacity(capacity),
            capacity,
            acc: 0,
            acc_bits: 0,
        }
    }

    fn ensure_room(&self, bits: usize) -> Result<()> {
        if self.pos() + bits > self.capacity * 8 {
            return Err(MuxError::BitstreamOverflow {
                needed: self.pos() + bits,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.ensure_room(1)?;
        self.push_bit(bit);
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | bit as u8;
        self.acc_bits += 1;
        if self.acc_bits == 8 {
            self.data.put_u8(self.acc);
            self.acc = 0;
            self.acc_bits = 0;
        }
    }

    /// Writes the low `n` bits of `value`, most significant first.
    ///
    /// Returns error if n > 32 or the writer is full.
    pub fn write_bits(&mut self, n: u32, value: u32) -> Result<()> {
        if n > 32 {
            return Err(MuxError::InvalidData(format!(
                "cannot write {} bits in one field",
                n
            )));
        }
        self.ensure_room(n as usize)?;

        // Byte-aligned fast path
        let mut remaining = n;
        while remaining > 0 {
            if self.acc_bits == 0 && remaining >= 8 {
                remaining -= 8;
                self.data.put_u8((value >> remaining) as u8);
            } else {
                remaining -= 1;
                self.push_bit((value >> remaining) & 1 == 1);
            }
        }
        Ok(())
    }

    /// Pads the current byte with zero bits.
    pub fn flush(&mut self) {
        if self.acc_bits > 0 {
            let pad = 8 - self.acc_bits;
            self.data.put_u8(self.acc << pad);
            self.acc = 0;
            self.acc_bits = 0;
        }
    }

    /// Flushes, then appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.flush();
        self.ensure_room(bytes.len() * 8)?;
        self.data.put_slice(bytes);
        Ok(())
    }

    /// Flushes, then appends `count` copies of `byte`.
    pub fn fill_bytes(&mut self, byte: u8, count: usize) -> Result<()> {
        self.flush();
        self.ensure_room(count * 8)?;
        self.data.put_bytes(byte, count);
        Ok(())
    }

    /// Current position in bits.
    pub fn pos(&self) -> usize {
        self.data.len() * 8 + self.acc_bits as usize
    }

    /// Number of whole bytes written so far.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Bytes that can still be written.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len() - (self.acc_bits > 0) as usize
    }

    /// Overwrites `n` bits starting at bit offset `at` without moving the
    /// cursor. The patched range must lie in already flushed bytes.
    pub fn patch_bits(&mut self, at: usize, n: u32, value: u32) -> Result<()> {
        if n > 32 || at + n as usize > self.data.len() * 8 {
            return Err(MuxError::InvalidData(format!(
                "patch of {} bits at {} is outside the written data",
                n, at
            )));
        }
        for i in 0..n as usize {
            let bit = (value >> (n as usize - 1 - i)) & 1;
            let byte = (at + i) / 8;
            let shift = 7 - ((at + i) % 8);
            self.data[byte] = (self.data[byte] & !(1 << shift)) | ((bit as u8) << shift);
        }
        Ok(())
    }

    /// Flushed bytes written so far. Bits of a partial byte are not included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Flushes and returns the written bytes.
    pub fn into_bytes(mut self) -> Bytes {
        self.flush();
        self.data.freeze()
    }
}

/// A bit-level reader for parsing what [`BitWriter`] produces.
///
/// Example:
/// ```
/// use tsmux::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Reads a single bit from the stream.
    ///
    /// Returns error if end of data is reached.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.byte_offset >= self.data.len() {
            return Err(MuxError::InvalidData("reached end of data".into()));
        }

        let bit = (self.data[self.byte_offset] >> (7 - self.bit_offset)) & 1;
        self.bit_offset += 1;

        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
        }

        Ok(bit == 1)
    }

    /// Reads n bits as a big-endian number.
    ///
    /// Returns error if n > 32 or end of data is reached.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(MuxError::InvalidData("too many bits requested".into()));
        }

        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u32;
        }
        Ok(value)
    }

    /// Skips n bits in the stream.
    pub fn skip_bits(&mut self, n: u32) -> Result<()> {
        for _ in 0..n {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Byte offset of the next whole byte.
    pub fn byte_pos(&self) -> usize {
        self.byte_offset + (self.bit_offset > 0) as usize
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        (self.data.len() - self.byte_offset) * 8 - self.bit_offset as usize
    }
}
