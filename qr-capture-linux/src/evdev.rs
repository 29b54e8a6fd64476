//! evdev trigger source.

use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qr_capture_core::models::error::CaptureError;
use qr_capture_core::models::input::InputEvent;
use qr_capture_core::session::stop::StopSignal;
use qr_capture_core::traits::event_source::EventSource;

use crate::poll::{wait_readable, Readiness};

/// Reads `struct input_event` records from an input device node.
///
/// Blocks in poll slices so a raised [`StopSignal`] is noticed within one
/// slice.
pub struct EvdevEventSource {
    path: PathBuf,
    file: File,
    poll_slice: Duration,
}

impl EvdevEventSource {
    pub fn open(path: impl AsRef<Path>, poll_slice: Duration) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| CaptureError::DeviceNotAvailable(format!("{}: {}", path.display(), e)))?;
        log::info!("listening for trigger events on {}", path.display());
        Ok(Self { path, file, poll_slice })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one record. `Ok(None)` at end of stream, `WouldBlock` when drained.
    fn read_record(&self) -> io::Result<Option<InputEvent>> {
        // SAFETY: input_event is plain data; all-zero is a valid value.
        let mut raw: libc::input_event = unsafe { mem::zeroed() };
        let size = mem::size_of::<libc::input_event>();
        // SAFETY: `raw` is a writable buffer of exactly `size` bytes.
        let n = unsafe { libc::read(self.file.as_raw_fd(), (&mut raw as *mut libc::input_event).cast(), size) };

        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n == 0 {
            return Ok(None);
        }
        if n as usize != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short input_event read: {} of {} bytes", n, size),
            ));
        }
        Ok(Some(InputEvent::new(raw.type_, raw.code, raw.value)))
    }
}

impl EventSource for EvdevEventSource {
    fn next_event(&mut self, stop: &StopSignal) -> Result<Option<InputEvent>, CaptureError> {
        loop {
            match wait_readable(self.file.as_raw_fd(), None, self.poll_slice, stop)
                .map_err(|e| CaptureError::from_io("poll", e))?
            {
                Readiness::Ready => {}
                Readiness::Stopped | Readiness::TimedOut => return Ok(None),
            }

            match self.read_record() {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {
                    log::info!("{}: end of event stream", self.path.display());
                    return Ok(None);
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => continue,
                Err(e) => return Err(CaptureError::from_io(&self.path.display().to_string(), e)),
            }
        }
    }
}
