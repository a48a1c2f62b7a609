use super::writer::TsWriter;
use crate::av::Frame;
use crate::error::Result;
use crate::format::Muxer;
use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use super::types::pts_to_seconds;

/// Drives a [`TsWriter`] and writes its packets to an async byte sink.
///
/// Frames are expected in decode order. After each frame the writer is run
/// until its clock reaches the frame's DTS less the start delay, so roughly
/// `start_delay` seconds of media stay queued ahead of the output.
pub struct TsSink<W: AsyncWrite + Unpin + Send> {
    writer: TsWriter,
    out: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin + Send> TsSink<W> {
    pub fn new(writer: TsWriter, out: W) -> Self {
        Self {
            writer,
            out: BufWriter::new(out),
        }
    }

    pub fn writer(&self) -> &TsWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut TsWriter {
        &mut self.writer
    }

    /// Flushes and returns the underlying sink.
    pub async fn into_inner(mut self) -> Result<W> {
        self.out.flush().await?;
        Ok(self.out.into_inner())
    }

    async fn write_packets(&mut self, target: f64) -> Result<()> {
        for packet in self.writer.write_until(target)? {
            self.out.write_all(packet.as_bytes()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Muxer for TsSink<W> {
    async fn write_header(&mut self) -> Result<()> {
        // PAT then one PMT per program
        for _ in 0..=self.writer.programs().len() {
            let packet = self.writer.next_packet()?;
            self.out.write_all(packet.as_bytes()).await?;
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        let target = pts_to_seconds(frame.dts) - self.writer.start_delay();
        self.writer.push_frame(frame)?;
        self.write_packets(target).await
    }

    async fn write_trailer(&mut self) -> Result<()> {
        for packet in self.writer.drain()? {
            self.out.write_all(packet.as_bytes()).await?;
        }
        debug!("trailer written, {} packets total", self.writer.packets_written());
        self.out.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }
}
