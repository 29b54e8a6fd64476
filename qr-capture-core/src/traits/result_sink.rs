use crate::models::error::{DecodeError, SinkError};
use crate::models::scan_result::ScanResult;

/// Destination for decoded payloads.
///
/// All methods are called from the session thread, in candidate order, and
/// complete before the next cycle starts.
pub trait ResultSink {
    /// A new cycle is starting. Anything buffered from a cycle that never
    /// reached `summary` belongs to an aborted scan.
    fn start_cycle(&mut self) {}

    /// Forward one decoded payload.
    fn emit(&mut self, payload: &[u8]) -> Result<(), SinkError>;

    /// Report a candidate that could not be decoded. Diagnostic only; the
    /// orchestrator has already logged the reason.
    fn emit_error(&mut self, _index: usize, _reason: &DecodeError) {}

    /// Receive the cycle summary once every candidate has been reported.
    fn summary(&mut self, _result: ScanResult) {}
}

impl<K: ResultSink + ?Sized> ResultSink for Box<K> {
    fn start_cycle(&mut self) {
        (**self).start_cycle()
    }

    fn emit(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        (**self).emit(payload)
    }

    fn emit_error(&mut self, index: usize, reason: &DecodeError) {
        (**self).emit_error(index, reason)
    }

    fn summary(&mut self, result: ScanResult) {
        (**self).summary(result)
    }
}
