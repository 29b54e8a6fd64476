use rqrr::{BitGrid, DeQRError, PreparedImage};

use crate::models::code::{DecodedPayload, EccLevel, ExtractedCode, Point};
use crate::models::error::{DecodeError, EngineError};
use crate::models::frame::Resolution;
use crate::processing::staging::StagingCanvas;
use crate::traits::decode_engine::DecodeEngine;

/// [`DecodeEngine`] backed by the `rqrr` recognizer.
///
/// Detection samples every grid eagerly, so candidates stay valid after the
/// prepared image is dropped and until the next `end()`.
#[derive(Debug, Default)]
pub struct RqrrEngine {
    canvas: StagingCanvas,
    codes: Vec<ExtractedCode>,
}

impl RqrrEngine {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            canvas: StagingCanvas::new(resolution),
            codes: Vec::new(),
        }
    }

    pub fn canvas(&self) -> &StagingCanvas {
        &self.canvas
    }
}

impl DecodeEngine for RqrrEngine {
    fn resize(&mut self, resolution: Resolution) -> Result<(), EngineError> {
        if self.canvas.resize(resolution)? {
            log::debug!("engine canvas resized to {}", resolution);
            self.codes.clear();
        }
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.canvas.resolution()
    }

    fn begin(&mut self) -> &mut [u8] {
        self.canvas.pixels_mut()
    }

    fn load(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        self.canvas.load(frame)
    }

    fn end(&mut self) -> Result<(), EngineError> {
        self.codes.clear();

        let resolution = self.canvas.resolution();
        if resolution.is_empty() {
            return Ok(());
        }

        let width = resolution.width;
        let pixels = self.canvas.pixels();
        let mut image = PreparedImage::prepare_from_greyscale(width, resolution.height, |x, y| pixels[y * width + x]);

        for grid in image.detect_grids() {
            let corners = grid.bounds.map(|p| Point { x: p.x, y: p.y });
            self.codes.push(sample(&grid.grid, corners));
        }
        Ok(())
    }

    fn candidate_count(&self) -> usize {
        self.codes.len()
    }

    fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError> {
        self.codes.get(index).cloned().ok_or(EngineError::CandidateOutOfRange {
            index,
            count: self.codes.len(),
        })
    }

    fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError> {
        let grid = rqrr::Grid {
            grid: code.clone(),
            bounds: code.corners().map(|p| rqrr::Point { x: p.x, y: p.y }),
        };

        let mut bytes = Vec::new();
        let meta = grid.decode_to(&mut bytes).map_err(map_error)?;

        Ok(DecodedPayload {
            bytes,
            version: meta.version.0,
            ecc_level: EccLevel::from_format_bits(meta.ecc_level),
            mask: meta.mask,
        })
    }
}

impl BitGrid for ExtractedCode {
    fn size(&self) -> usize {
        ExtractedCode::size(self)
    }

    fn bit(&self, y: usize, x: usize) -> bool {
        ExtractedCode::bit(self, x, y)
    }
}

fn sample<G: BitGrid>(grid: &G, corners: [Point; 4]) -> ExtractedCode {
    ExtractedCode::from_fn(grid.size(), corners, |x, y| grid.bit(y, x))
}

fn map_error(err: DeQRError) -> DecodeError {
    match err {
        DeQRError::InvalidGridSize => DecodeError::InvalidGridSize,
        DeQRError::InvalidVersion => DecodeError::InvalidVersion,
        DeQRError::FormatEcc => DecodeError::FormatEcc,
        DeQRError::DataEcc => DecodeError::DataEcc,
        DeQRError::UnknownDataType => DecodeError::UnknownDataType,
        DeQRError::DataOverflow => DecodeError::DataOverflow,
        DeQRError::DataUnderflow => DecodeError::DataUnderflow,
        DeQRError::IoError => DecodeError::PayloadWrite,
        DeQRError::EncodingError => DecodeError::Encoding,
    }
}
