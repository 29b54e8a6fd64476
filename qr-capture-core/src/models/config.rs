use std::path::PathBuf;
use std::time::Duration;

use super::frame::Resolution;
use super::input::TriggerSpec;

/// Configuration for a trigger-driven scan session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfiguration {
    /// V4L2 capture device (default: `/dev/video0`).
    pub camera_device: PathBuf,

    /// evdev input device delivering the trigger key (default: `/dev/input/event0`).
    pub input_device: PathBuf,

    /// UART receiving decoded payloads (default: `/dev/ttyS2`).
    pub serial_device: PathBuf,

    /// UART baud rate (default: 115200).
    pub baud_rate: u32,

    /// Fixed capture resolution (default: 640x480).
    pub resolution: Resolution,

    /// Maximum wait for a frame after streaming starts (default: 2 s).
    pub capture_timeout: Duration,

    /// Granularity at which blocking waits check the stop signal (default: 100 ms).
    pub poll_slice: Duration,

    /// Event that starts a cycle.
    pub trigger: TriggerSpec,

    /// Bytes written after every payload (default: CR LF).
    pub line_terminator: Vec<u8>,

    /// Optional JSON-lines scan journal.
    pub journal_path: Option<PathBuf>,

    /// Optional sysfs LED brightness file lit while the session is armed.
    pub status_led: Option<PathBuf>,
}

impl ScanConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution.is_empty() {
            return Err(format!("resolution must be non-zero, got {}", self.resolution));
        }
        if self.capture_timeout.is_zero() {
            return Err("capture timeout must be positive".into());
        }
        if self.poll_slice.is_zero() || self.poll_slice > self.capture_timeout {
            return Err(format!(
                "poll slice must be within (0, {:?}], got {:?}",
                self.capture_timeout, self.poll_slice
            ));
        }
        if self.baud_rate == 0 {
            return Err("baud rate must be positive".into());
        }
        if self.line_terminator.is_empty() {
            return Err("line terminator must not be empty".into());
        }
        Ok(())
    }
}

impl Default for ScanConfiguration {
    fn default() -> Self {
        Self {
            camera_device: PathBuf::from("/dev/video0"),
            input_device: PathBuf::from("/dev/input/event0"),
            serial_device: PathBuf::from("/dev/ttyS2"),
            baud_rate: 115_200,
            resolution: Resolution::new(640, 480),
            capture_timeout: Duration::from_secs(2),
            poll_slice: Duration::from_millis(100),
            trigger: TriggerSpec::default(),
            line_terminator: b"\r\n".to_vec(),
            journal_path: None,
            status_led: Some(PathBuf::from("/sys/class/leds/green/brightness")),
        }
    }
}
