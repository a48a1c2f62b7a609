//! Writer configuration.
//!
//! A [`WriterConfig`] is built in code with `Default` and the `with_*`
//! methods. Scalar settings can then be overridden from `TSMUX_*` environment
//! variables and from a `key = value` file, in that order. Programs and
//! streams are only configured in code.

use crate::error::{MuxError, Result};
use crate::format::ts::descriptors::SmoothingBuffer;
use crate::format::ts::{Descriptor, StreamFormat, TsType};
use std::env;
use std::path::Path;

/// Default multiplex rate in bits per second.
pub const DEFAULT_MUX_RATE: u64 = 10_000_000;
/// Default interval between PAT/PMT repetitions, in seconds.
pub const DEFAULT_PAT_PERIOD: f64 = 0.1;
/// Default interval between PCRs, in seconds.
pub const DEFAULT_PCR_PERIOD: f64 = 0.035;
/// Default lead of the system clock over the first decode time, in seconds.
pub const DEFAULT_START_DELAY: f64 = 0.5;

const DEFAULT_TEMPLATE: &str = r#"# tsmux configuration
# Copy this file to 'tsmux.conf' and adjust. Every key is optional.

# generic, atsc, cablelabs, dvb, bluray or isdb
ts_type = "generic"

# Multiplex rate in bits per second
mux_rate = 10000000

transport_stream_id = 1

# Network PID announced in the PAT (leave unset for none)
# network_pid = 16

# Seconds between PAT/PMT repetitions
pat_period = 0.1

# Seconds between PCRs
pcr_period = 0.035

# Seconds the system clock starts ahead of the first DTS
start_delay = 0.5
"#;

/// One elementary stream of a program.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub pid: u16,
    pub format: StreamFormat,
    /// PES stream_id; the format's default when `None`
    pub stream_id: Option<u8>,
    /// ISO 639-2 language code
    pub language: Option<[u8; 3]>,
    /// Carry DVB AU_information in the adaptation field (video only)
    pub dvb_au: bool,
    /// Pre-encoded descriptors appended to the ES_info loop
    pub descriptors: Vec<Descriptor>,
}

impl StreamConfig {
    pub fn new(pid: u16, format: StreamFormat) -> Self {
        Self {
            pid,
            format,
            stream_id: None,
            language: None,
            dvb_au: false,
            descriptors: Vec::new(),
        }
    }

    pub fn with_stream_id(mut self, stream_id: u8) -> Self {
        self.stream_id = Some(stream_id);
        self
    }

    pub fn with_language(mut self, language: [u8; 3]) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_dvb_au(mut self, dvb_au: bool) -> Self {
        self.dvb_au = dvb_au;
        self
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }
}

/// One program of the multiplex.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramConfig {
    pub program_number: u16,
    pub pmt_pid: u16,
    pub pcr_pid: u16,
    pub smoothing_buffer: Option<SmoothingBuffer>,
    pub streams: Vec<StreamConfig>,
}

impl ProgramConfig {
    /// A program whose PCR goes on `pcr_pid`.
    pub fn new(program_number: u16, pmt_pid: u16, pcr_pid: u16) -> Self {
        Self {
            program_number,
            pmt_pid,
            pcr_pid,
            smoothing_buffer: None,
            streams: Vec::new(),
        }
    }

    pub fn with_stream(mut self, stream: StreamConfig) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn with_smoothing_buffer(mut self, leak_rate: u32, size: u32) -> Self {
        self.smoothing_buffer = Some(SmoothingBuffer { leak_rate, size });
        self
    }
}

/// Settings of one output transport stream.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    pub ts_type: TsType,
    /// Multiplex rate in bits per second
    pub mux_rate: u64,
    pub transport_stream_id: u16,
    pub network_pid: Option<u16>,
    /// Seconds between PAT/PMT repetitions
    pub pat_period: f64,
    /// Seconds between PCRs
    pub pcr_period: f64,
    /// Seconds the clock starts ahead of the first DTS
    pub start_delay: f64,
    pub programs: Vec<ProgramConfig>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            ts_type: TsType::Generic,
            mux_rate: DEFAULT_MUX_RATE,
            transport_stream_id: 1,
            network_pid: None,
            pat_period: DEFAULT_PAT_PERIOD,
            pcr_period: DEFAULT_PCR_PERIOD,
            start_delay: DEFAULT_START_DELAY,
            programs: Vec::new(),
        }
    }
}

impl WriterConfig {
    pub fn new(ts_type: TsType, mux_rate: u64) -> Self {
        Self {
            ts_type,
            mux_rate,
            ..Default::default()
        }
    }

    pub fn with_transport_stream_id(mut self, id: u16) -> Self {
        self.transport_stream_id = id;
        self
    }

    pub fn with_network_pid(mut self, pid: u16) -> Self {
        self.network_pid = Some(pid);
        self
    }

    pub fn with_pat_period(mut self, seconds: f64) -> Self {
        self.pat_period = seconds;
        self
    }

    pub fn with_pcr_period(mut self, seconds: f64) -> Self {
        self.pcr_period = seconds;
        self
    }

    pub fn with_start_delay(mut self, seconds: f64) -> Self {
        self.start_delay = seconds;
        self
    }

    pub fn with_program(mut self, program: ProgramConfig) -> Self {
        self.programs.push(program);
        self
    }

    /// Overrides scalar settings from `TSMUX_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        for key in KEYS {
            let var = format!("TSMUX_{}", key.to_ascii_uppercase());
            if let Ok(value) = env::var(&var) {
                self.set(key, &value)?;
            }
        }
        Ok(())
    }

    /// Overrides scalar settings from a `key = value` file.
    ///
    /// Blank lines and `#` comments are skipped; values may be quoted.
    pub fn apply_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.apply_str(&content)
    }

    /// Same as [`WriterConfig::apply_file`] on already loaded text.
    pub fn apply_str(&mut self, content: &str) -> Result<()> {
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                MuxError::InvalidConfig(format!("expected 'key = value', got '{}'", line))
            })?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            self.set(key.trim(), value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ts_type" => self.ts_type = value.parse()?,
            "mux_rate" => self.mux_rate = value.parse()?,
            "transport_stream_id" => self.transport_stream_id = value.parse()?,
            "network_pid" => self.network_pid = Some(value.parse()?),
            "pat_period" => self.pat_period = parse_seconds(key, value)?,
            "pcr_period" => self.pcr_period = parse_seconds(key, value)?,
            "start_delay" => self.start_delay = parse_seconds(key, value)?,
            _ => {
                return Err(MuxError::InvalidConfig(format!(
                    "unknown configuration key '{}'",
                    key
                )))
            }
        }
        Ok(())
    }
}

const KEYS: [&str; 7] = [
    "ts_type",
    "mux_rate",
    "transport_stream_id",
    "network_pid",
    "pat_period",
    "pcr_period",
    "start_delay",
];

fn parse_seconds(key: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(MuxError::InvalidConfig(format!(
            "'{}' must be a non-negative number of seconds, got '{}'",
            key, value
        ))),
    }
}

/// Writes a commented configuration template if `path` does not exist yet.
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        std::fs::write(path, DEFAULT_TEMPLATE)?;
    }
    Ok(())
}
