use super::error::SessionError;

/// Frame source state machine.
///
/// ```text
/// closed → configured → streaming → configured → closed
/// ```
///
/// `capture()` is only valid in `Configured`; it passes through `Streaming`
/// and returns to `Configured` on completion or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Closed,
    Configured,
    Streaming,
}

/// Trigger session state machine.
///
/// ```text
/// idle → waiting → capturing → scanning → waiting …
///           ↓          ↓           ↓
///        stopped / failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Waiting,
    Capturing,
    Scanning,
    Stopped,
    Failed(SessionError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Between a trigger and the end of its scan cycle.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Capturing | Self::Scanning)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Capturing => "capturing",
            Self::Scanning => "scanning",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}
