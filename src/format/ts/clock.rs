use super::types::{split_pcr, PCR_HZ, TS_PACKET_BITS};

/// A program's position on the system clock.
///
/// `cur_pcr` is in seconds and moves forward by one packet time for every
/// packet the multiplex emits, whichever PID it is on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramClock {
    cur_pcr: f64,
    last_pcr: Option<u64>,
    last_pcr_time: Option<f64>,
    discontinuity: bool,
}

impl ProgramClock {
    pub fn new(start: f64) -> Self {
        Self {
            cur_pcr: start,
            ..Default::default()
        }
    }

    /// Current clock in seconds.
    pub fn cur_pcr(&self) -> f64 {
        self.cur_pcr
    }

    pub fn set_cur_pcr(&mut self, seconds: f64) {
        self.cur_pcr = seconds;
    }

    /// Moves the clock to `seconds` and makes the next PCR due at once.
    ///
    /// If a PCR was already written, the next one is flagged as a timebase
    /// discontinuity.
    pub fn restart(&mut self, seconds: f64) {
        self.cur_pcr = seconds;
        self.last_pcr_time = None;
        if self.last_pcr.is_some() {
            self.discontinuity = true;
        }
    }

    /// Whether the next PCR must carry the discontinuity_indicator.
    pub fn discontinuity_pending(&self) -> bool {
        self.discontinuity
    }

    /// Last PCR written, in 27 MHz ticks.
    pub fn last_pcr(&self) -> Option<u64> {
        self.last_pcr
    }

    pub fn advance(&mut self, packets: u64, mux_rate: u64) {
        self.cur_pcr += packet_time(mux_rate) * packets as f64;
    }

    /// Whether a PCR must go out in the next packet.
    pub fn pcr_due(&self, pcr_period: f64) -> bool {
        match self.last_pcr_time {
            None => true,
            Some(t) => self.cur_pcr - t >= pcr_period,
        }
    }

    /// Stamps a PCR for a packet starting now and returns `(base, extension)`.
    /// Clears a pending discontinuity, so read it first.
    ///
    /// The written value is offset to the arrival of the byte that completes
    /// the PCR field, seven bytes into the packet.
    pub fn stamp(&mut self, mux_rate: u64) -> (u64, u16) {
        let pcr = (self.cur_pcr * PCR_HZ as f64) as u64;
        self.last_pcr = Some(pcr);
        self.last_pcr_time = Some(self.cur_pcr);
        self.discontinuity = false;
        split_pcr(pcr + PCR_HZ * 7 * 8 / mux_rate)
    }
}

/// Duration of one transport packet at `mux_rate` bits/s, in seconds.
pub fn packet_time(mux_rate: u64) -> f64 {
    TS_PACKET_BITS as f64 / mux_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_by_packet_time() {
        let mut clock = ProgramClock::new(1.0);
        clock.advance(1, 1_504_000);
        assert!((clock.cur_pcr() - 1.001).abs() < 1e-12);
        clock.advance(10, 1_504_000);
        assert!((clock.cur_pcr() - 1.011).abs() < 1e-12);
    }

    #[test]
    fn test_stamp_offsets_and_splits() {
        let mut clock = ProgramClock::new(1.0);
        assert!(clock.pcr_due(0.04));
        // 27 MHz * 56 bits / 27 Mb/s = 56 ticks past the packet start
        let (base, ext) = clock.stamp(27_000_000);
        assert_eq!(clock.last_pcr(), Some(27_000_000));
        assert_eq!(base, 90_000);
        assert_eq!(ext, 56);
        assert!(!clock.pcr_due(0.04));
        clock.set_cur_pcr(1.04);
        assert!(clock.pcr_due(0.04));
    }

    #[test]
    fn test_restart_makes_pcr_due() {
        let mut clock = ProgramClock::new(0.0);
        clock.stamp(10_000_000);
        clock.restart(5.0);
        assert!(clock.pcr_due(1.0));
        assert_eq!(clock.last_pcr(), Some(0));
        assert!(clock.discontinuity_pending());
        clock.stamp(10_000_000);
        assert!(!clock.discontinuity_pending());
    }

    #[test]
    fn test_restart_before_any_pcr_is_continuous() {
        let mut clock = ProgramClock::new(0.0);
        clock.restart(5.0);
        assert!(!clock.discontinuity_pending());
    }
}
