use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A point in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Raw module grid sampled from one detected candidate.
///
/// Cells are stored row-major, `true` for a dark module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    size: usize,
    cells: Vec<bool>,
    corners: [Point; 4],
}

impl ExtractedCode {
    pub fn new(size: usize, corners: [Point; 4]) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
            corners,
        }
    }

    /// Build a grid by sampling `dark(x, y)` for every module.
    pub fn from_fn(size: usize, corners: [Point; 4], mut dark: impl FnMut(usize, usize) -> bool) -> Self {
        let mut code = Self::new(size, corners);
        for y in 0..size {
            for x in 0..size {
                code.cells[y * size + x] = dark(x, y);
            }
        }
        code
    }

    /// Number of modules per side.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn bit(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.size + x]
    }

    pub fn set(&mut self, x: usize, y: usize, dark: bool) {
        self.cells[y * self.size + x] = dark;
    }

    /// Mirror the grid about its main diagonal.
    ///
    /// Recovers symbols captured through a mirror or printed mirrored, whose
    /// format bits survive but whose data codewords fail ECC.
    pub fn flip(&mut self) {
        let n = self.size;
        for y in 0..n {
            for x in (y + 1)..n {
                self.cells.swap(y * n + x, x * n + y);
            }
        }
    }

    pub fn dark_modules(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// Error-correction level read from a symbol's format information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EccLevel {
    L,
    M,
    Q,
    H,
}

impl EccLevel {
    /// Map the two format-information bits (`00` = M, `01` = L, `10` = H, `11` = Q).
    pub fn from_format_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Self::M),
            1 => Some(Self::L),
            2 => Some(Self::H),
            3 => Some(Self::Q),
            _ => None,
        }
    }
}

/// Successfully decoded symbol content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    pub version: usize,
    pub ecc_level: Option<EccLevel>,
    pub mask: u16,
}

impl DecodedPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            version: 0,
            ecc_level: None,
            mask: 0,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}
