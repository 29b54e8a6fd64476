//! sysfs status LED.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// LED driven through a sysfs `brightness` attribute.
#[derive(Debug)]
pub struct StatusLed {
    path: PathBuf,
}

impl StatusLed {
    /// Check that `path` is writable. The LED state is left untouched.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        OpenOptions::new().write(true).open(&path)?;
        Ok(Self { path })
    }

    pub fn on(&self) -> io::Result<()> {
        self.write(b"1")
    }

    pub fn off(&self) -> io::Result<()> {
        self.write(b"0")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, value: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        file.write_all(value)?;
        log::debug!("{} <- {}", self.path.display(), String::from_utf8_lossy(value));
        Ok(())
    }
}
