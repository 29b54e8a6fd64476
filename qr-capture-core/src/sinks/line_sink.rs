use std::io::Write;

use crate::models::error::SinkError;
use crate::traits::result_sink::ResultSink;

/// Writes each payload followed by a line terminator to a byte channel.
///
/// ```text
/// [payload bytes][CR LF]
/// ```
///
/// The channel is flushed after every payload so a reader on the other end
/// of a UART sees complete lines.
pub struct LineSink<W: Write> {
    writer: W,
    terminator: Vec<u8>,
    lines_written: u64,
}

impl<W: Write> LineSink<W> {
    /// A sink using CR LF terminators.
    pub fn new(writer: W) -> Self {
        Self::with_terminator(writer, b"\r\n".to_vec())
    }

    pub fn with_terminator(writer: W, terminator: Vec<u8>) -> Self {
        Self {
            writer,
            terminator,
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for LineSink<W> {
    fn emit(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        self.writer.write_all(payload)?;
        self.writer.write_all(&self.terminator)?;
        self.writer.flush()?;
        self.lines_written += 1;
        Ok(())
    }
}
