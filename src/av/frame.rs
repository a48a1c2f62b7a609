use bytes::Bytes;

/// Access unit details some delivery profiles signal in the adaptation field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuInfo {
    /// Picture/slice coding type (I = 1, P = 2, B = 3 for MPEG-2)
    pub frame_type: u8,
    pub ref_pic_idc: u8,
    pub pic_struct: u8,
}

/// One access unit handed to the muxer.
///
/// Timestamps are on the 90 kHz clock and are reduced modulo 2^33 when written.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pid: u16,
    pub data: Bytes,
    pub pts: u64,
    pub dts: u64,
    pub random_access: bool,
    pub priority: bool,
    pub au_info: AuInfo,
}

impl Frame {
    /// Creates a frame with PTS = DTS = 0.
    pub fn new(pid: u16, data: impl Into<Bytes>) -> Self {
        Self {
            pid,
            data: data.into(),
            pts: 0,
            dts: 0,
            random_access: false,
            priority: false,
            au_info: AuInfo::default(),
        }
    }

    /// Sets PTS and DTS to the same value.
    pub fn with_timestamp(mut self, ts: u64) -> Self {
        self.pts = ts;
        self.dts = ts;
        self
    }

    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = pts;
        self
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = dts;
        self
    }

    pub fn with_random_access(mut self, random_access: bool) -> Self {
        self.random_access = random_access;
        self
    }

    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_au_info(mut self, au_info: AuInfo) -> Self {
        self.au_info = au_info;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
