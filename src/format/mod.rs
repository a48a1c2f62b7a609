use crate::av::Frame;
use crate::Result;

pub mod ts;

/// Common trait for format muxers
#[async_trait::async_trait]
pub trait Muxer: Send {
    /// Write stream header information
    async fn write_header(&mut self) -> Result<()>;

    /// Write one access unit to the stream
    async fn write_frame(&mut self, frame: Frame) -> Result<()>;

    /// Write stream trailer information
    async fn write_trailer(&mut self) -> Result<()>;

    /// Flush any buffered output
    async fn flush(&mut self) -> Result<()>;
}

pub use self::ts::{TsSink, TsWriter};
