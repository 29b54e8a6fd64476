#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use qr_capture_core::{
    DecodeEngine, DecodeError, DecodedPayload, EngineError, ExtractedCode, OwnedFrame, Point, Resolution,
    StagingCanvas,
};
use qrcode::{Color, QrCode};

pub const VGA: Resolution = Resolution::new(640, 480);

/// A white VGA frame.
pub fn blank_frame() -> OwnedFrame {
    OwnedFrame::filled(VGA, 255)
}

/// A white VGA frame with `text` rendered as a QR symbol at `scale` px per module.
pub fn symbol_frame(text: &[u8], left: usize, top: usize, scale: usize) -> OwnedFrame {
    render(text, left, top, scale, false)
}

/// Like [`symbol_frame`], but with the module matrix transposed, as seen
/// through a mirror.
pub fn mirrored_symbol_frame(text: &[u8], left: usize, top: usize, scale: usize) -> OwnedFrame {
    render(text, left, top, scale, true)
}

fn render(text: &[u8], left: usize, top: usize, scale: usize, transpose: bool) -> OwnedFrame {
    let mut frame = blank_frame();
    let code = QrCode::new(text).unwrap();
    let width = code.width();
    let colors = code.to_colors();
    for my in 0..width {
        for mx in 0..width {
            let module = if transpose { mx * width + my } else { my * width + mx };
            if colors[module] != Color::Dark {
                continue;
            }
            for py in 0..scale {
                let row = (top + my * scale + py) * VGA.width;
                let start = row + left + mx * scale;
                frame.data[start..start + scale].fill(0);
            }
        }
    }
    frame
}

/// Wraps an engine and counts the calls the orchestrator makes.
pub struct CountingEngine<E: DecodeEngine> {
    pub inner: E,
    pub detections: Cell<usize>,
    pub decodes: Cell<usize>,
}

impl<E: DecodeEngine> CountingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            detections: Cell::new(0),
            decodes: Cell::new(0),
        }
    }
}

impl<E: DecodeEngine> DecodeEngine for CountingEngine<E> {
    fn resize(&mut self, resolution: Resolution) -> Result<(), EngineError> {
        self.inner.resize(resolution)
    }

    fn resolution(&self) -> Resolution {
        self.inner.resolution()
    }

    fn begin(&mut self) -> &mut [u8] {
        self.inner.begin()
    }

    fn load(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        self.inner.load(frame)
    }

    fn end(&mut self) -> Result<(), EngineError> {
        self.detections.set(self.detections.get() + 1);
        self.inner.end()
    }

    fn candidate_count(&self) -> usize {
        self.inner.candidate_count()
    }

    fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError> {
        self.inner.extract(index)
    }

    fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError> {
        self.decodes.set(self.decodes.get() + 1);
        self.inner.decode(code)
    }
}

/// Engine whose candidates fail data ECC as captured and decode once flipped,
/// the way a mirrored print does.
pub struct MirroredEngine {
    canvas: StagingCanvas,
    payloads: Vec<&'static str>,
    detected: usize,
    pub decode_log: RefCell<Vec<(usize, bool)>>,
}

impl MirroredEngine {
    pub fn new(payloads: Vec<&'static str>) -> Self {
        Self {
            canvas: StagingCanvas::default(),
            payloads,
            detected: 0,
            decode_log: RefCell::new(Vec::new()),
        }
    }

    pub fn decodes_for(&self, index: usize) -> usize {
        self.decode_log.borrow().iter().filter(|(i, _)| *i == index).count()
    }
}

impl DecodeEngine for MirroredEngine {
    fn resize(&mut self, resolution: Resolution) -> Result<(), EngineError> {
        self.canvas.resize(resolution).map(|_| ())
    }

    fn resolution(&self) -> Resolution {
        self.canvas.resolution()
    }

    fn begin(&mut self) -> &mut [u8] {
        self.canvas.pixels_mut()
    }

    fn end(&mut self) -> Result<(), EngineError> {
        self.detected = self.payloads.len();
        Ok(())
    }

    fn candidate_count(&self) -> usize {
        self.detected
    }

    fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError> {
        if index >= self.detected {
            return Err(EngineError::CandidateOutOfRange {
                index,
                count: self.detected,
            });
        }
        // Marker module at (0, 1); a flip moves it to (1, 0).
        let corners = [Point { x: index as i32, y: 0 }; 4];
        Ok(ExtractedCode::from_fn(21, corners, |x, y| x == 0 && y == 1))
    }

    fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError> {
        let index = code.corners()[0].x as usize;
        let flipped = code.bit(1, 0);
        self.decode_log.borrow_mut().push((index, flipped));
        if flipped {
            Ok(DecodedPayload::new(self.payloads[index].as_bytes().to_vec()))
        } else {
            Err(DecodeError::DataEcc)
        }
    }
}
