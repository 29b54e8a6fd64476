use thiserror::Error;

use super::frame::Resolution;

/// Errors raised by a frame source while opening, configuring or capturing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("format rejected: requested {requested}, driver offered {actual}")]
    FormatRejected { requested: Resolution, actual: Resolution },

    #[error("timeout waiting for frame")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CaptureError {
    /// A timed-out capture only skips the current cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    pub fn from_io(context: &str, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", context, err))
    }
}

/// Engine-level failures. Any of these aborts the scan cycle in progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine allocation failed: {0}")]
    AllocationFailed(String),

    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("candidate {index} out of range ({count} detected)")]
    CandidateOutOfRange { index: usize, count: usize },

    #[error("detection failed: {0}")]
    Detection(String),
}

/// Coarse classification of a per-candidate decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    Format,
    Ecc,
    Data,
}

/// Per-candidate decode failure. Local to one candidate, never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeError {
    #[error("Invalid grid size")]
    InvalidGridSize,

    #[error("Invalid version")]
    InvalidVersion,

    #[error("Format data ECC failure")]
    FormatEcc,

    #[error("ECC failure")]
    DataEcc,

    #[error("Unknown data type")]
    UnknownDataType,

    #[error("Data overflow")]
    DataOverflow,

    #[error("Data underflow")]
    DataUnderflow,

    #[error("Payload write failed")]
    PayloadWrite,

    #[error("Invalid text encoding")]
    Encoding,
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            Self::InvalidGridSize | Self::InvalidVersion | Self::FormatEcc => DecodeErrorKind::Format,
            Self::DataEcc => DecodeErrorKind::Ecc,
            Self::UnknownDataType
            | Self::DataOverflow
            | Self::DataUnderflow
            | Self::PayloadWrite
            | Self::Encoding => DecodeErrorKind::Data,
        }
    }

    /// Only data-ECC failures are eligible for the flip retry.
    pub fn is_ecc(&self) -> bool {
        self.kind() == DecodeErrorKind::Ecc
    }
}

/// Failure writing to a result sink. Reported, never aborts a cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Write(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

/// Errors that terminate a trigger session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),

    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    #[error("sink: {0}")]
    Sink(#[from] SinkError),

    #[error("configuration: {0}")]
    Configuration(String),
}
