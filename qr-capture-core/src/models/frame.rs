use std::fmt;

use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Byte length of a single-channel 8-bit frame at this resolution.
    pub const fn byte_len(&self) -> usize {
        self.width * self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layouts a frame source can deliver. Only 8-bit grey is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Grey,
}

impl PixelFormat {
    /// V4L2 fourcc code.
    pub const fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::Grey => *b"GREY",
        }
    }
}

/// Read-only view over a frame owned by its source.
///
/// The view borrows the source mutably for `'a`, so it cannot outlive the
/// next `capture()` call that would requeue the underlying buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [u8],
    resolution: Resolution,
    sequence: u64,
}

impl<'a> FrameView<'a> {
    pub fn new(data: &'a [u8], resolution: Resolution, sequence: u64) -> Self {
        Self {
            data,
            resolution,
            sequence,
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the byte extent matches the advertised resolution exactly.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.resolution.byte_len()
    }

    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            data: self.data.to_vec(),
            resolution: self.resolution,
            sequence: self.sequence,
        }
    }
}

/// Heap copy of a frame, for replay and for keeping a frame past its cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub resolution: Resolution,
    pub sequence: u64,
}

impl OwnedFrame {
    pub fn new(data: Vec<u8>, resolution: Resolution) -> Self {
        Self {
            data,
            resolution,
            sequence: 0,
        }
    }

    /// A uniformly filled frame (blank white by default in tests).
    pub fn filled(resolution: Resolution, value: u8) -> Self {
        Self::new(vec![value; resolution.byte_len()], resolution)
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(&self.data, self.resolution, self.sequence)
    }
}
