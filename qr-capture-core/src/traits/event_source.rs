use crate::models::error::CaptureError;
use crate::models::input::InputEvent;
use crate::session::stop::StopSignal;

/// A blocking stream of input events.
pub trait EventSource {
    /// Wait for the next event.
    ///
    /// Returns `Ok(None)` once the stream has ended or `stop` was raised.
    fn next_event(&mut self, stop: &StopSignal) -> Result<Option<InputEvent>, CaptureError>;
}
