//! Leaky bucket buffers of the transport stream system target decoder.

use super::types::TS_PACKET_BITS;
use log::trace;

/// One T-STD buffer. Fill level and size are in bits.
///
/// Fills one transport packet at a time and drains a byte at a time at the
/// stream's leak rate. The fill level stays within `0..=buf_size`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeakyBuffer {
    cur_buf: u64,
    buf_size: u64,
    last_byte_removal_time: Option<f64>,
}

impl LeakyBuffer {
    pub fn new(buf_size: u64) -> Self {
        Self {
            buf_size,
            ..Default::default()
        }
    }

    pub fn fill(&self) -> u64 {
        self.cur_buf
    }

    pub fn size(&self) -> u64 {
        self.buf_size
    }

    /// Changes the capacity, clamping the current fill to it.
    pub fn set_size(&mut self, buf_size: u64) {
        self.buf_size = buf_size;
        self.cur_buf = self.cur_buf.min(buf_size);
    }

    /// Empties the buffer and forgets the removal clock.
    pub fn reset(&mut self) {
        self.cur_buf = 0;
        self.last_byte_removal_time = None;
    }

    pub fn last_byte_removal_time(&self) -> Option<f64> {
        self.last_byte_removal_time
    }

    /// Whether one more transport packet fits.
    pub fn has_room(&self) -> bool {
        self.cur_buf + TS_PACKET_BITS <= self.buf_size
    }

    /// Adds one transport packet worth of bits. Saturates at the capacity.
    pub fn add_packet(&mut self) {
        let filled = self.cur_buf + TS_PACKET_BITS;
        if filled > self.buf_size {
            trace!(
                "buffer saturated: {} + {} bits over {} bit capacity",
                self.cur_buf,
                TS_PACKET_BITS,
                self.buf_size
            );
        }
        self.cur_buf = filled.min(self.buf_size);
    }

    /// Drains the buffer up to `next_pcr` (seconds) at `rx` bits/s.
    ///
    /// The first call anchors the removal clock at `anchor` (the program's
    /// current clock) and removes one byte. Later calls remove one byte per
    /// `8 / rx` seconds for every removal instant before `next_pcr`.
    pub fn drip(&mut self, rx: f64, anchor: f64, next_pcr: f64) {
        let mut removed: u64 = 0;
        let mut last = match self.last_byte_removal_time {
            Some(t) => t,
            None => {
                removed += 8;
                anchor
            }
        };

        let step = 8.0 / rx;
        if last + step < next_pcr {
            // Whole steps strictly before next_pcr, corrected for rounding
            let mut n = ((next_pcr - last) / step).ceil() as u64;
            while n > 0 && last + n as f64 * step >= next_pcr {
                n -= 1;
            }
            while last + (n + 1) as f64 * step < next_pcr {
                n += 1;
            }
            last += n as f64 * step;
            removed += 8 * n;
        }

        self.last_byte_removal_time = Some(last);
        self.cur_buf = self.cur_buf.saturating_sub(removed);
    }
}
