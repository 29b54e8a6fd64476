use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use qr_capture_core::session::stop::StopSignal;

/// Outcome of waiting for a descriptor to become readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    TimedOut,
    Stopped,
}

/// Poll `fd` for input in slices of at most `slice`, checking `stop` before
/// each slice. Without a deadline this waits until input or stop.
pub(crate) fn wait_readable(
    fd: RawFd,
    deadline: Option<Instant>,
    slice: Duration,
    stop: &StopSignal,
) -> io::Result<Readiness> {
    loop {
        if stop.is_stopped() {
            return Ok(Readiness::Stopped);
        }

        let wait = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(Readiness::TimedOut);
                }
                remaining.min(slice)
            }
            None => slice,
        };

        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = wait.as_millis().clamp(1, libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a single valid pollfd for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc > 0 {
            if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 && pfd.revents & libc::POLLIN == 0 {
                return Err(io::Error::other(format!("poll revents {:#x}", pfd.revents)));
            }
            return Ok(Readiness::Ready);
        }
    }
}
