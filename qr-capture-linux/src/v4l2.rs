//! V4L2 single-buffer grey frame source.
//!
//! One MMAP buffer is requested and mapped at open time. Every capture
//! queues it, starts streaming, waits for it to fill and stops streaming
//! again, so the device only runs while a trigger is being served.

use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::ptr;
use std::time::{Duration, Instant};

use qr_capture_core::models::config::ScanConfiguration;
use qr_capture_core::models::error::CaptureError;
use qr_capture_core::models::frame::{FrameView, PixelFormat, Resolution};
use qr_capture_core::models::state::SourceState;
use qr_capture_core::session::stop::StopSignal;
use qr_capture_core::traits::frame_source::FrameSource;

use crate::poll::{wait_readable, Readiness};

const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
const V4L2_MEMORY_MMAP: u32 = 1;
const V4L2_FIELD_NONE: u32 = 1;
const V4L2_BUF_FLAG_ERROR: u32 = 0x0040;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct V4l2PixFormat {
    width: u32,
    height: u32,
    pixelformat: u32,
    field: u32,
    bytesperline: u32,
    sizeimage: u32,
    colorspace: u32,
    priv_: u32,
    flags: u32,
    ycbcr_enc: u32,
    quantization: u32,
    xfer_func: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union V4l2FormatUnion {
    pix: V4l2PixFormat,
    raw_data: [u8; 200],
    // The kernel union holds pointers (v4l2_window), which sets its alignment.
    _align: *mut libc::c_void,
}

#[repr(C)]
struct V4l2Format {
    type_: u32,
    fmt: V4l2FormatUnion,
}

#[repr(C)]
#[allow(dead_code)]
struct V4l2RequestBuffers {
    count: u32,
    type_: u32,
    memory: u32,
    capabilities: u32,
    flags: u8,
    reserved: [u8; 3],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct V4l2Timecode {
    type_: u32,
    flags: u32,
    frames: u8,
    seconds: u8,
    minutes: u8,
    hours: u8,
    userbits: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union V4l2BufferM {
    offset: u32,
    userptr: libc::c_ulong,
    planes: *mut libc::c_void,
    fd: i32,
}

#[repr(C)]
#[allow(dead_code)]
struct V4l2Buffer {
    index: u32,
    type_: u32,
    bytesused: u32,
    flags: u32,
    field: u32,
    timestamp: libc::timeval,
    timecode: V4l2Timecode,
    sequence: u32,
    memory: u32,
    m: V4l2BufferM,
    length: u32,
    reserved2: u32,
    request_fd: i32,
}

impl V4l2Buffer {
    fn mmap_capture(index: u32) -> Self {
        // SAFETY: all-zero is a valid bit pattern for this plain C struct.
        let mut buf: Self = unsafe { mem::zeroed() };
        buf.index = index;
        buf.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        buf.memory = V4L2_MEMORY_MMAP;
        buf
    }
}

const IOC_WRITE: u64 = 1;
const IOC_READ: u64 = 2;

const fn ioc(dir: u64, nr: u64, size: usize) -> u64 {
    (dir << 30) | ((size as u64) << 16) | ((b'V' as u64) << 8) | nr
}

const VIDIOC_S_FMT: u64 = ioc(IOC_READ | IOC_WRITE, 5, mem::size_of::<V4l2Format>());
const VIDIOC_REQBUFS: u64 = ioc(IOC_READ | IOC_WRITE, 8, mem::size_of::<V4l2RequestBuffers>());
const VIDIOC_QUERYBUF: u64 = ioc(IOC_READ | IOC_WRITE, 9, mem::size_of::<V4l2Buffer>());
const VIDIOC_QBUF: u64 = ioc(IOC_READ | IOC_WRITE, 15, mem::size_of::<V4l2Buffer>());
const VIDIOC_DQBUF: u64 = ioc(IOC_READ | IOC_WRITE, 17, mem::size_of::<V4l2Buffer>());
const VIDIOC_STREAMON: u64 = ioc(IOC_WRITE, 18, mem::size_of::<libc::c_int>());
const VIDIOC_STREAMOFF: u64 = ioc(IOC_WRITE, 19, mem::size_of::<libc::c_int>());

/// `ioctl` that retries on `EINTR`.
fn xioctl<T>(fd: RawFd, request: u64, arg: &mut T) -> io::Result<()> {
    loop {
        // SAFETY: `arg` points to a live, correctly sized struct for `request`.
        let rc = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
        if rc != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// The single mapped capture buffer.
struct MappedBuffer {
    ptr: *mut u8,
    len: usize,
}

impl MappedBuffer {
    fn map(fd: RawFd, len: usize, offset: u32) -> io::Result<Self> {
        // SAFETY: mapping a driver-provided buffer; the result is checked below.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { ptr: ptr.cast(), len })
    }

    fn as_slice(&self, len: usize) -> &[u8] {
        // SAFETY: `ptr` maps `self.len` bytes until `unmap`; `len` is clamped.
        unsafe { std::slice::from_raw_parts(self.ptr, len.min(self.len)) }
    }

    fn unmap(&mut self) -> io::Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        // SAFETY: `ptr`/`len` came from a successful mmap and are unmapped once.
        let rc = unsafe { libc::munmap(self.ptr.cast(), self.len) };
        self.ptr = ptr::null_mut();
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// V4L2 camera delivering 8-bit grey frames at a fixed resolution.
pub struct V4l2FrameSource {
    path: PathBuf,
    file: Option<File>,
    buffer: MappedBuffer,
    resolution: Resolution,
    timeout: Duration,
    poll_slice: Duration,
    state: SourceState,
    sequence: u64,
}

// SAFETY: the mapping is owned exclusively by this value and only touched
// through `&mut self` (capture/close) or `&self` reads of the frame view.
unsafe impl Send for V4l2FrameSource {}

impl V4l2FrameSource {
    /// Open `path`, negotiate `GREY` at `resolution` and map one buffer.
    pub fn open(
        path: impl AsRef<Path>,
        resolution: Resolution,
        timeout: Duration,
        poll_slice: Duration,
    ) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| CaptureError::DeviceNotAvailable(format!("{}: {}", path.display(), e)))?;
        let fd = file.as_raw_fd();

        set_format(fd, resolution)?;

        let mut req = V4l2RequestBuffers {
            count: 1,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: V4L2_MEMORY_MMAP,
            capabilities: 0,
            flags: 0,
            reserved: [0; 3],
        };
        xioctl(fd, VIDIOC_REQBUFS, &mut req)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("VIDIOC_REQBUFS: {}", e)))?;
        if req.count < 1 {
            return Err(CaptureError::ConfigurationFailed(
                "driver granted no capture buffers".into(),
            ));
        }

        let mut buf = V4l2Buffer::mmap_capture(0);
        xioctl(fd, VIDIOC_QUERYBUF, &mut buf)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("VIDIOC_QUERYBUF: {}", e)))?;
        // SAFETY: QUERYBUF on an MMAP buffer fills the `offset` member.
        let offset = unsafe { buf.m.offset };
        if (buf.length as usize) < resolution.byte_len() {
            return Err(CaptureError::ConfigurationFailed(format!(
                "capture buffer holds {} bytes, {} needs {}",
                buf.length,
                resolution,
                resolution.byte_len()
            )));
        }
        let buffer = MappedBuffer::map(fd, buf.length as usize, offset)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("mmap: {}", e)))?;

        log::info!(
            "camera {} configured: {} GREY, {} byte buffer",
            path.display(),
            resolution,
            buffer.len
        );

        Ok(Self {
            path,
            file: Some(file),
            buffer,
            resolution,
            timeout,
            poll_slice,
            state: SourceState::Configured,
            sequence: 0,
        })
    }

    pub fn from_config(config: &ScanConfiguration) -> Result<Self, CaptureError> {
        Self::open(
            &config.camera_device,
            config.resolution,
            config.capture_timeout,
            config.poll_slice,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fd(&self) -> Result<RawFd, CaptureError> {
        self.file
            .as_ref()
            .map(|f| f.as_raw_fd())
            .ok_or_else(|| CaptureError::InvalidState("device is closed".into()))
    }

    fn stream_off(&mut self, fd: RawFd) {
        let mut type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE as libc::c_int;
        if let Err(e) = xioctl(fd, VIDIOC_STREAMOFF, &mut type_) {
            log::warn!("VIDIOC_STREAMOFF: {}", e);
        }
        self.state = SourceState::Configured;
    }

    /// Wait for the queued buffer and dequeue it. Returns bytes used and
    /// the buffer flags.
    fn wait_and_dequeue(&self, fd: RawFd, stop: &StopSignal) -> Result<(usize, u32), CaptureError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match wait_readable(fd, Some(deadline), self.poll_slice, stop)
                .map_err(|e| CaptureError::from_io("poll", e))?
            {
                Readiness::Ready => {}
                Readiness::TimedOut => return Err(CaptureError::Timeout),
                Readiness::Stopped => return Err(CaptureError::Cancelled),
            }

            let mut buf = V4l2Buffer::mmap_capture(0);
            match xioctl(fd, VIDIOC_DQBUF, &mut buf) {
                Ok(()) => return Ok((buf.bytesused as usize, buf.flags)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(CaptureError::from_io("VIDIOC_DQBUF", e)),
            }
        }
    }
}

fn set_format(fd: RawFd, resolution: Resolution) -> Result<(), CaptureError> {
    let requested_fourcc = u32::from_le_bytes(PixelFormat::Grey.fourcc());

    // SAFETY: all-zero is a valid bit pattern for this plain C struct.
    let mut fmt: V4l2Format = unsafe { mem::zeroed() };
    fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
    fmt.fmt.pix = V4l2PixFormat {
        width: resolution.width as u32,
        height: resolution.height as u32,
        pixelformat: requested_fourcc,
        field: V4L2_FIELD_NONE,
        bytesperline: 0,
        sizeimage: 0,
        colorspace: 0,
        priv_: 0,
        flags: 0,
        ycbcr_enc: 0,
        quantization: 0,
        xfer_func: 0,
    };

    xioctl(fd, VIDIOC_S_FMT, &mut fmt)
        .map_err(|e| CaptureError::ConfigurationFailed(format!("VIDIOC_S_FMT: {}", e)))?;

    // SAFETY: S_FMT with a capture type fills the `pix` member.
    let pix = unsafe { fmt.fmt.pix };
    check_format(resolution, requested_fourcc, &pix)
}

/// Accept only the exact packed layout the decoder expects: the requested
/// size, `GREY`, and rows of exactly `width` bytes.
fn check_format(resolution: Resolution, fourcc: u32, pix: &V4l2PixFormat) -> Result<(), CaptureError> {
    let actual = Resolution::new(pix.width as usize, pix.height as usize);
    if actual != resolution {
        return Err(CaptureError::FormatRejected {
            requested: resolution,
            actual,
        });
    }
    if pix.pixelformat != fourcc {
        return Err(CaptureError::ConfigurationFailed(format!(
            "driver substituted pixel format {:?}",
            pix.pixelformat.to_le_bytes().map(char::from)
        )));
    }
    // A padded stride is reported as the row length the driver would deliver.
    if pix.bytesperline as usize != resolution.width {
        return Err(CaptureError::FormatRejected {
            requested: resolution,
            actual: Resolution::new(pix.bytesperline as usize, pix.height as usize),
        });
    }
    Ok(())
}

/// Length of the frame to hand out for a dequeued buffer.
///
/// Drivers may report `bytesused` up to `sizeimage`; only the first
/// `expected` bytes are the image.
fn frame_len(bytes_used: usize, flags: u32, expected: usize) -> Result<usize, CaptureError> {
    if flags & V4L2_BUF_FLAG_ERROR != 0 {
        return Err(CaptureError::Io("driver flagged the frame as corrupt".into()));
    }
    if bytes_used < expected {
        return Err(CaptureError::Io(format!(
            "short frame: {} of {} bytes",
            bytes_used, expected
        )));
    }
    Ok(expected)
}

impl FrameSource for V4l2FrameSource {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn capture(&mut self, stop: &StopSignal) -> Result<FrameView<'_>, CaptureError> {
        if self.state != SourceState::Configured {
            return Err(CaptureError::InvalidState(format!(
                "capture requires a configured source, state is {:?}",
                self.state
            )));
        }
        let fd = self.fd()?;

        let mut buf = V4l2Buffer::mmap_capture(0);
        xioctl(fd, VIDIOC_QBUF, &mut buf).map_err(|e| CaptureError::from_io("VIDIOC_QBUF", e))?;

        let mut type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE as libc::c_int;
        xioctl(fd, VIDIOC_STREAMON, &mut type_).map_err(|e| CaptureError::from_io("VIDIOC_STREAMON", e))?;
        self.state = SourceState::Streaming;

        let outcome = self.wait_and_dequeue(fd, stop);
        self.stream_off(fd);
        let (bytes_used, flags) = outcome?;
        let len = frame_len(bytes_used, flags, self.resolution.byte_len())?;

        self.sequence += 1;
        log::trace!("frame {}: {} bytes used", self.sequence, bytes_used);
        Ok(FrameView::new(self.buffer.as_slice(len), self.resolution, self.sequence))
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let fd = file.as_raw_fd();

        if self.state == SourceState::Streaming {
            self.stream_off(fd);
        }
        let unmapped = self.buffer.unmap();

        let mut req = V4l2RequestBuffers {
            count: 0,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: V4L2_MEMORY_MMAP,
            capabilities: 0,
            flags: 0,
            reserved: [0; 3],
        };
        if let Err(e) = xioctl(fd, VIDIOC_REQBUFS, &mut req) {
            log::debug!("releasing buffers: {}", e);
        }

        drop(file);
        self.state = SourceState::Closed;
        log::info!("camera {} closed after {} frames", self.path.display(), self.sequence);

        unmapped.map_err(|e| CaptureError::from_io("munmap", e))
    }
}

impl Drop for V4l2FrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing {}: {}", self.path.display(), e);
        }
    }
}
