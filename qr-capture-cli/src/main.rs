//! Key-triggered QR scanner.
//!
//! Waits for the scan key, captures one grey frame, decodes every QR symbol
//! in it and writes each payload as a line to the UART.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use qr_capture_core::{
    DecodeOrchestrator, JournalingSink, LineSink, ReplayEventSource, ReplayFrameSource, Resolution, ResultSink,
    RqrrEngine, ScanConfiguration, ScanJournal, ScanResult, SessionError, SessionState, StopSignal, TriggerSession,
    TriggerSpec,
};

/// Trigger-driven QR code scanner for V4L2 cameras.
///
/// Every press of the scan key captures one frame; decoded payloads are
/// written to the serial port, one per line.
#[derive(Parser, Debug)]
#[command(name = "qr-capture")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// V4L2 capture device
    #[arg(long, default_value = "/dev/video0", value_name = "PATH")]
    camera: PathBuf,

    /// evdev input device delivering the scan key
    #[arg(long, default_value = "/dev/input/event0", value_name = "PATH")]
    input: PathBuf,

    /// Serial port receiving decoded payloads
    #[arg(long, default_value = "/dev/ttyS2", value_name = "PATH")]
    serial: PathBuf,

    /// Serial baud rate
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Capture width in pixels
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Capture height in pixels
    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Key code that triggers a scan (148 = KEY_PROG1)
    #[arg(long, default_value_t = 148)]
    key_code: u16,

    /// Maximum wait for a frame, in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Append a JSON-lines record of every scan to this file
    #[arg(long, value_name = "PATH")]
    journal: Option<PathBuf>,

    /// sysfs brightness file of the status LED
    #[arg(long, default_value = "/sys/class/leds/green/brightness", value_name = "PATH")]
    led: PathBuf,

    /// Do not drive the status LED
    #[arg(long)]
    no_led: bool,

    /// Scan a single frame immediately and exit
    #[arg(long)]
    once: bool,

    /// Scan raw WIDTHxHEIGHT grey dumps instead of the camera; payloads go to stdout
    #[arg(long, value_name = "FILE", num_args = 1..)]
    replay: Vec<PathBuf>,
}

impl Args {
    fn to_config(&self) -> ScanConfiguration {
        let defaults = ScanConfiguration::default();
        let capture_timeout = Duration::from_millis(self.timeout_ms);
        ScanConfiguration {
            camera_device: self.camera.clone(),
            input_device: self.input.clone(),
            serial_device: self.serial.clone(),
            baud_rate: self.baud,
            resolution: Resolution::new(self.width, self.height),
            capture_timeout,
            poll_slice: defaults.poll_slice.min(capture_timeout),
            trigger: TriggerSpec::key_press(self.key_code),
            journal_path: self.journal.clone(),
            status_led: (!self.no_led).then(|| self.led.clone()),
            ..defaults
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = args.to_config();
    config.validate().map_err(anyhow::Error::msg).context("Invalid configuration")?;

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_stop.stop()) {
        log::warn!("Failed to install Ctrl+C handler: {}", err);
    }

    let totals = if args.replay.is_empty() {
        run_device(&config, args.once, stop)?
    } else {
        run_replay(&config, &args.replay, stop)?
    };

    print_totals(&totals);
    Ok(())
}

#[cfg(target_os = "linux")]
fn run_device(config: &ScanConfiguration, once: bool, stop: StopSignal) -> Result<ScanResult> {
    use qr_capture_linux::{EvdevEventSource, SerialPort, V4l2FrameSource};

    let camera = V4l2FrameSource::from_config(config)
        .with_context(|| format!("Failed to open camera {}", config.camera_device.display()))?;
    let keys = EvdevEventSource::open(&config.input_device, config.poll_slice)
        .with_context(|| format!("Failed to open input device {}", config.input_device.display()))?;
    let port = SerialPort::open(&config.serial_device, config.baud_rate)
        .with_context(|| format!("Failed to open serial port {}", config.serial_device.display()))?;

    let sink = build_sink(config, LineSink::with_terminator(port, config.line_terminator.clone()))?;
    let orchestrator = DecodeOrchestrator::new(RqrrEngine::new(config.resolution));
    let mut session = TriggerSession::new(camera, orchestrator, keys, sink, config.trigger).with_stop_signal(stop);
    if let Some(indicator) = led::LedIndicator::open(config) {
        session.set_delegate(Arc::new(indicator));
    }

    if once {
        if session.run_once_now()?.is_none() {
            log::warn!("No frame captured");
        }
        return Ok(session.shutdown()?);
    }
    Ok(session.run()?)
}

#[cfg(not(target_os = "linux"))]
fn run_device(_config: &ScanConfiguration, _once: bool, _stop: StopSignal) -> Result<ScanResult> {
    anyhow::bail!("device capture requires Linux; use --replay to scan recorded frames")
}

/// Scan each recorded frame once, writing payloads to stdout.
fn run_replay(config: &ScanConfiguration, files: &[PathBuf], stop: StopSignal) -> Result<ScanResult> {
    let frames = ReplayFrameSource::from_files(config.resolution, files).context("Failed to load replay frames")?;
    let sink = build_sink(config, LineSink::with_terminator(io::stdout(), b"\n".to_vec()))?;
    let orchestrator = DecodeOrchestrator::new(RqrrEngine::new(config.resolution));
    let mut session = TriggerSession::new(frames, orchestrator, ReplayEventSource::default(), sink, config.trigger)
        .with_stop_signal(stop.clone());

    for path in files {
        if stop.is_stopped() {
            break;
        }
        log::info!("Scanning {}", path.display());
        session.run_once_now()?;
    }
    Ok(session.shutdown()?)
}

/// Wrap `base` in a journaling sink when a journal path is configured.
fn build_sink<K: ResultSink + 'static>(config: &ScanConfiguration, base: K) -> Result<Box<dyn ResultSink>> {
    let Some(path) = config.journal_path.as_deref() else {
        return Ok(Box::new(base));
    };
    let journal = open_journal(path)?;
    log::info!("Journaling scans to {}", path.display());
    Ok(Box::new(JournalingSink::new(base, journal)))
}

fn open_journal(path: &Path) -> Result<ScanJournal> {
    ScanJournal::open(path).with_context(|| format!("Failed to open journal {}", path.display()))
}

fn print_totals(totals: &ScanResult) {
    println!(
        "Frames: {}, candidates: {}, decoded: {}, failed: {}, mean detection: {:.1} ms",
        totals.frame_count,
        totals.candidates_found,
        totals.successfully_decoded,
        totals.failed(),
        totals.mean_detection_ms()
    );
}

#[cfg(target_os = "linux")]
mod led {
    use super::*;
    use qr_capture_core::SessionDelegate;
    use qr_capture_linux::StatusLed;

    /// Lights the status LED while the scanner is waiting for a trigger.
    pub(super) struct LedIndicator {
        led: StatusLed,
    }

    impl LedIndicator {
        pub(super) fn open(config: &ScanConfiguration) -> Option<Self> {
            let path = config.status_led.as_ref()?;
            match StatusLed::open(path) {
                Ok(led) => Some(Self { led }),
                Err(e) => {
                    log::warn!("Status LED {} unavailable: {}", path.display(), e);
                    None
                }
            }
        }

        fn set(&self, lit: bool) {
            let result = if lit { self.led.on() } else { self.led.off() };
            if let Err(e) = result {
                log::warn!("Status LED {}: {}", self.led.path().display(), e);
            }
        }
    }

    impl SessionDelegate for LedIndicator {
        fn on_state_changed(&self, state: &SessionState) {
            match state {
                SessionState::Waiting => self.set(true),
                SessionState::Capturing | SessionState::Stopped | SessionState::Failed(_) => self.set(false),
                _ => {}
            }
        }

        fn on_scan_finished(&self, result: &ScanResult) {
            log::debug!("scan finished: {}/{} decoded", result.successfully_decoded, result.candidates_found);
        }

        fn on_error(&self, _error: &SessionError) {}
    }
}
