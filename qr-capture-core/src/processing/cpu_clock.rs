/// Millisecond clock used to time the detection pass.
pub trait CpuClock {
    fn now_ms(&self) -> u64;
}

/// CPU time consumed by the whole process.
///
/// Time spent blocked (waiting for a key press or a frame) does not advance
/// this clock, so it only measures detection work.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCpuClock;

#[cfg(unix)]
impl CpuClock for ProcessCpuClock {
    fn now_ms(&self) -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
        if rc != 0 {
            log::trace!("clock_gettime(CLOCK_PROCESS_CPUTIME_ID) failed");
            return 0;
        }
        ts.tv_sec as u64 * 1000 + ts.tv_nsec as u64 / 1_000_000
    }
}

#[cfg(not(unix))]
impl CpuClock for ProcessCpuClock {
    fn now_ms(&self) -> u64 {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
    }
}

impl<C: CpuClock + ?Sized> CpuClock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
