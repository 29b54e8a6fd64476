use crate::models::code::{DecodedPayload, ExtractedCode};
use crate::models::error::{DecodeError, EngineError};
use crate::models::frame::Resolution;
use crate::processing::staging::copy_exact;

/// Call contract of a QR recognition engine.
///
/// An engine owns a single working canvas and the candidate list of the last
/// detection pass; both are mutated in place, so every operation that touches
/// them takes `&mut self`.
pub trait DecodeEngine {
    /// Resize the working canvas. Idempotent when unchanged.
    fn resize(&mut self, resolution: Resolution) -> Result<(), EngineError>;

    /// Current canvas resolution.
    fn resolution(&self) -> Resolution;

    /// Mutable access to the canvas, exactly `resolution().byte_len()` bytes.
    fn begin(&mut self) -> &mut [u8];

    /// Copy a whole frame into the canvas. Fails without writing when the
    /// length is not exactly the canvas size.
    fn load(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        copy_exact(self.begin(), frame)
    }

    /// Run the detection pass over the canvas.
    fn end(&mut self) -> Result<(), EngineError>;

    /// Candidates registered by the last `end()`.
    fn candidate_count(&self) -> usize;

    /// Sample the module grid of candidate `index`.
    fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError>;

    /// Decode an extracted grid.
    fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError>;
}
