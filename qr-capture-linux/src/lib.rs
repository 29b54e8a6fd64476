//! # qr-capture-linux
//!
//! Linux device backends for qr-capture.
//!
//! Provides:
//! - `V4l2FrameSource`: single-buffer MMAP grey capture via V4L2 ioctls
//! - `EvdevEventSource`: trigger key events from an evdev node
//! - `SerialPort`: raw 8N1 UART, wrapped in a `LineSink` for output
//! - `StatusLed`: sysfs LED lit while the scanner is armed
//!
//! ## Usage
//! ```ignore
//! use qr_capture_core::{DecodeOrchestrator, LineSink, RqrrEngine, ScanConfiguration, TriggerSession};
//! use qr_capture_linux::{EvdevEventSource, SerialPort, V4l2FrameSource};
//!
//! let config = ScanConfiguration::default();
//! let camera = V4l2FrameSource::from_config(&config)?;
//! let keys = EvdevEventSource::open(&config.input_device, config.poll_slice)?;
//! let uart = LineSink::new(SerialPort::open(&config.serial_device, config.baud_rate)?);
//! let orchestrator = DecodeOrchestrator::new(RqrrEngine::new(config.resolution));
//! let mut session = TriggerSession::new(camera, orchestrator, keys, uart, config.trigger);
//! session.run()?;
//! ```

#[cfg(target_os = "linux")]
pub mod evdev;
#[cfg(target_os = "linux")]
pub mod led;
#[cfg(target_os = "linux")]
mod poll;
#[cfg(target_os = "linux")]
pub mod serial;
#[cfg(target_os = "linux")]
pub mod v4l2;

#[cfg(target_os = "linux")]
pub use evdev::EvdevEventSource;
#[cfg(target_os = "linux")]
pub use led::StatusLed;
#[cfg(target_os = "linux")]
pub use serial::SerialPort;
#[cfg(target_os = "linux")]
pub use v4l2::V4l2FrameSource;
