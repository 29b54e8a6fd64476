use crate::models::error::{DecodeError, SinkError};
use crate::models::scan_result::ScanResult;
use crate::traits::result_sink::ResultSink;

/// Sink that keeps everything it receives in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub payloads: Vec<Vec<u8>>,
    pub errors: Vec<(usize, DecodeError)>,
    pub summaries: Vec<ScanResult>,
    /// Number of cycles started.
    pub cycles: usize,
    fail_writes: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `emit` always fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

impl ResultSink for MemorySink {
    fn start_cycle(&mut self) {
        self.cycles += 1;
    }

    fn emit(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        if self.fail_writes {
            return Err(SinkError::Write("sink is closed".into()));
        }
        self.payloads.push(payload.to_vec());
        Ok(())
    }

    fn emit_error(&mut self, index: usize, reason: &DecodeError) {
        self.errors.push((index, *reason));
    }

    fn summary(&mut self, result: ScanResult) {
        self.summaries.push(result);
    }
}
