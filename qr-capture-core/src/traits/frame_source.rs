use crate::models::error::CaptureError;
use crate::models::frame::{FrameView, Resolution};
use crate::models::state::SourceState;
use crate::session::stop::StopSignal;

/// A camera-like device producing one fixed-format grey frame per request.
///
/// Implemented by:
/// - `V4l2FrameSource` (Linux, in `qr-capture-linux`)
/// - `ReplayFrameSource` (recorded frames)
pub trait FrameSource {
    /// Resolution negotiated at open time.
    fn resolution(&self) -> Resolution;

    fn state(&self) -> SourceState;

    /// Capture one frame. Valid only in `Configured`.
    ///
    /// Blocks until the frame is ready, the capture timeout elapses
    /// (`CaptureError::Timeout`, recoverable) or `stop` is raised
    /// (`CaptureError::Cancelled`). The returned view is invalidated by the
    /// next call, which the borrow on `self` enforces.
    fn capture(&mut self, stop: &StopSignal) -> Result<FrameView<'_>, CaptureError>;

    /// Stop streaming and release the device. Idempotent.
    fn close(&mut self) -> Result<(), CaptureError>;
}
