use crate::models::error::EngineError;
use crate::models::frame::Resolution;

/// Fixed-size grey canvas owned by a decode engine.
///
/// Decouples the engine's working memory from the device-owned capture
/// buffer. Its dimensions always equal the last `resize` request, and `load`
/// only accepts exactly that many bytes.
#[derive(Debug, Clone)]
pub struct StagingCanvas {
    pixels: Vec<u8>,
    resolution: Resolution,
}

impl StagingCanvas {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            pixels: vec![0; resolution.byte_len()],
            resolution,
        }
    }

    /// Resize to `resolution`, zeroing the canvas. No-op when unchanged.
    ///
    /// Returns whether a reallocation happened.
    pub fn resize(&mut self, resolution: Resolution) -> Result<bool, EngineError> {
        if resolution == self.resolution {
            return Ok(false);
        }

        let len = resolution.byte_len();
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            EngineError::AllocationFailed(format!("{} canvas ({} bytes): {}", resolution, len, e))
        })?;
        pixels.resize(len, 0);

        self.pixels = pixels;
        self.resolution = resolution;
        Ok(true)
    }

    /// Copy a full frame into the canvas.
    ///
    /// A length other than `width * height` is rejected before any byte is
    /// written.
    pub fn load(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        copy_exact(&mut self.pixels, frame)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.resolution.width + x]
    }
}

/// Copy `src` over all of `dst`, refusing any length mismatch up front.
pub fn copy_exact(dst: &mut [u8], src: &[u8]) -> Result<(), EngineError> {
    if src.len() != dst.len() {
        return Err(EngineError::FrameSizeMismatch {
            expected: dst.len(),
            actual: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

impl Default for StagingCanvas {
    fn default() -> Self {
        Self::new(Resolution::new(0, 0))
    }
}
