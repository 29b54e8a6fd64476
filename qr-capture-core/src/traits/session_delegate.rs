use crate::models::error::SessionError;
use crate::models::scan_result::ScanResult;
use crate::models::state::SessionState;

/// Notifications from a trigger session.
///
/// Called on the session thread; implementations must not block.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called after each completed scan cycle.
    fn on_scan_finished(&self, result: &ScanResult);

    /// Called for errors the session absorbs (timeouts) and the one that ends it.
    fn on_error(&self, error: &SessionError);
}
