//! # qr-capture-core
//!
//! Platform-agnostic core of a trigger-driven QR code scanner.
//!
//! A key press starts one cycle: a single grey frame is captured, copied into
//! the decode engine's staging canvas, every detected symbol is decoded
//! (retrying once with a mirrored grid on ECC failure) and each payload is
//! written to a result sink. Device backends (V4L2 camera, evdev keys, UART)
//! live in `qr-capture-linux` and plug in through the traits below.
//!
//! ## Architecture
//!
//! ```text
//! qr-capture-core (this crate)
//! ├── traits/       ← FrameSource, DecodeEngine, EventSource, ResultSink, SessionDelegate
//! ├── models/       ← errors, frames, extracted codes, ScanResult, states, ScanConfiguration
//! ├── processing/   ← StagingCanvas, DecodeOrchestrator, CPU clock
//! ├── engine/       ← RqrrEngine (rqrr-backed DecodeEngine)
//! ├── session/      ← TriggerSession, StopSignal
//! ├── sinks/        ← LineSink, JournalingSink, MemorySink
//! ├── sources/      ← ReplayFrameSource, ReplayEventSource
//! └── storage/      ← ScanJournal (JSON lines)
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod session;
pub mod sinks;
pub mod sources;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use engine::rqrr_engine::RqrrEngine;
pub use models::code::{DecodedPayload, EccLevel, ExtractedCode, Point};
pub use models::config::ScanConfiguration;
pub use models::error::{CaptureError, DecodeError, DecodeErrorKind, EngineError, SessionError, SinkError};
pub use models::frame::{FrameView, OwnedFrame, PixelFormat, Resolution};
pub use models::input::{InputEvent, TriggerSpec};
pub use models::scan_result::{CandidateOutcome, ScanResult};
pub use models::state::{SessionState, SourceState};
pub use processing::cpu_clock::{CpuClock, ProcessCpuClock};
pub use processing::orchestrator::DecodeOrchestrator;
pub use processing::staging::StagingCanvas;
pub use session::stop::StopSignal;
pub use session::trigger::{SessionHandle, TriggerSession};
pub use sinks::journaling::JournalingSink;
pub use sinks::line_sink::LineSink;
pub use sinks::memory::MemorySink;
pub use sources::replay::{ReplayEventSource, ReplayFrameSource};
pub use storage::journal::{ScanJournal, ScanRecord};
pub use traits::decode_engine::DecodeEngine;
pub use traits::event_source::EventSource;
pub use traits::frame_source::FrameSource;
pub use traits::result_sink::ResultSink;
pub use traits::session_delegate::SessionDelegate;
