use std::collections::VecDeque;
use std::path::Path;

use crate::models::error::CaptureError;
use crate::models::frame::{FrameView, OwnedFrame, Resolution};
use crate::models::input::InputEvent;
use crate::models::state::SourceState;
use crate::session::stop::StopSignal;
use crate::traits::event_source::EventSource;
use crate::traits::frame_source::FrameSource;

/// Frame source that plays back recorded frames (or scripted errors) in order.
///
/// Follows the same state machine as a camera: `capture()` is only valid in
/// `Configured`, and `close()` moves to `Closed` for good.
pub struct ReplayFrameSource {
    resolution: Resolution,
    queue: VecDeque<Result<OwnedFrame, CaptureError>>,
    current: Option<OwnedFrame>,
    state: SourceState,
    captures: u64,
    closes: u32,
}

impl ReplayFrameSource {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            queue: VecDeque::new(),
            current: None,
            state: SourceState::Configured,
            captures: 0,
            closes: 0,
        }
    }

    pub fn from_frames(resolution: Resolution, frames: impl IntoIterator<Item = OwnedFrame>) -> Self {
        let mut source = Self::new(resolution);
        for frame in frames {
            source.push_frame(frame);
        }
        source
    }

    /// Load raw 8-bit grey dumps of exactly `width * height` bytes each.
    pub fn from_files<P: AsRef<Path>>(resolution: Resolution, paths: &[P]) -> Result<Self, CaptureError> {
        let mut source = Self::new(resolution);
        for path in paths {
            source.push_frame(load_gray(path.as_ref(), resolution)?);
        }
        Ok(source)
    }

    pub fn push_frame(&mut self, frame: OwnedFrame) {
        self.queue.push_back(Ok(frame));
    }

    /// Queue an error to be returned by the next capture in line.
    pub fn push_error(&mut self, error: CaptureError) {
        self.queue.push_back(Err(error));
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// How many times `close()` was called, including repeated calls.
    pub fn close_calls(&self) -> u32 {
        self.closes
    }
}

impl FrameSource for ReplayFrameSource {
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
        if stop.is_stopped() {
            return Err(CaptureError::Cancelled);
        }

        self.state = SourceState::Streaming;
        let next = self.queue.pop_front();
        self.state = SourceState::Configured;

        match next {
            Some(Ok(mut frame)) => {
                self.captures += 1;
                frame.sequence = self.captures;
                let frame = self.current.insert(frame);
                Ok(frame.view())
            }
            Some(Err(e)) => Err(e),
            None => Err(CaptureError::DeviceNotAvailable("no recorded frames left".into())),
        }
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        self.closes += 1;
        if self.state != SourceState::Closed {
            log::debug!("replay source closed after {} captures", self.captures);
        }
        self.state = SourceState::Closed;
        self.current = None;
        Ok(())
    }
}

/// Read a raw grey dump and check it matches `resolution`.
pub fn load_gray(path: &Path, resolution: Resolution) -> Result<OwnedFrame, CaptureError> {
    let data = std::fs::read(path).map_err(|e| CaptureError::from_io(&path.display().to_string(), e))?;
    if data.len() != resolution.byte_len() {
        return Err(CaptureError::ConfigurationFailed(format!(
            "{}: {} bytes, expected {} for {}",
            path.display(),
            data.len(),
            resolution.byte_len(),
            resolution
        )));
    }
    Ok(OwnedFrame::new(data, resolution))
}

/// Event source that serves a fixed script of events, then ends.
#[derive(Debug, Default)]
pub struct ReplayEventSource {
    events: VecDeque<Result<InputEvent, CaptureError>>,
    served: usize,
}

impl ReplayEventSource {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().map(Ok).collect(),
            served: 0,
        }
    }

    pub fn push_error(&mut self, error: CaptureError) {
        self.events.push_back(Err(error));
    }

    pub fn served(&self) -> usize {
        self.served
    }
}

impl EventSource for ReplayEventSource {
    fn next_event(&mut self, stop: &StopSignal) -> Result<Option<InputEvent>, CaptureError> {
        if stop.is_stopped() {
            return Ok(None);
        }
        match self.events.pop_front() {
            Some(Ok(event)) => {
                self.served += 1;
                Ok(Some(event))
            }
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
