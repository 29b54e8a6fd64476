//! Raw 8N1 UART output.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Map a numeric baud rate onto its termios speed constant.
pub fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        460_800 => libc::B460800,
        921_600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}

/// A serial port configured raw, 8 data bits, no parity, one stop bit.
pub struct SerialPort {
    path: PathBuf,
    file: File,
    baud: u32,
}

impl SerialPort {
    pub fn open(path: impl AsRef<Path>, baud: u32) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(baud).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unsupported baud rate {}", baud))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)?;
        let fd = file.as_raw_fd();

        // SAFETY: termios is plain data; tcgetattr fully initialises it.
        let mut tty: libc::termios = unsafe { mem::zeroed() };
        // SAFETY: `fd` is open and `tty` is a valid termios.
        if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: `tty` is a valid termios for all of the calls below.
        unsafe {
            libc::cfmakeraw(&mut tty);
            libc::cfsetispeed(&mut tty, speed);
            libc::cfsetospeed(&mut tty, speed);
        }
        tty.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE | libc::CRTSCTS);
        tty.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        tty.c_cc[libc::VMIN] = 0;
        tty.c_cc[libc::VTIME] = 0;

        // SAFETY: `fd` is open and `tty` is a valid termios.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `fd` is an open terminal.
        unsafe { libc::tcflush(fd, libc::TCIOFLUSH) };

        log::info!("serial output {} at {} baud, 8N1", path.display(), baud);
        Ok(Self { path, file, baud })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    /// Block until every queued byte has left the UART.
    fn flush(&mut self) -> io::Result<()> {
        loop {
            // SAFETY: the descriptor stays open for the lifetime of `self`.
            if unsafe { libc::tcdrain(self.file.as_raw_fd()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }
}
