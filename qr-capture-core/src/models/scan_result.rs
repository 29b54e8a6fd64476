use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use super::code::DecodedPayload;
use super::error::DecodeError;

/// Per-cycle scan summary.
///
/// Created fresh for every cycle. Totals across cycles only ever come from
/// [`ScanResult::accumulate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub frame_count: u32,
    pub candidates_found: u32,
    pub successfully_decoded: u32,
    pub detection_duration_ms: u64,
}

impl ScanResult {
    pub fn accumulate(&mut self, other: &ScanResult) {
        self.frame_count += other.frame_count;
        self.candidates_found += other.candidates_found;
        self.successfully_decoded += other.successfully_decoded;
        self.detection_duration_ms += other.detection_duration_ms;
    }

    pub fn failed(&self) -> u32 {
        self.candidates_found - self.successfully_decoded
    }

    /// Mean detection time per frame, 0.0 before the first frame.
    pub fn mean_detection_ms(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.detection_duration_ms as f64 / self.frame_count as f64
    }
}

impl AddAssign for ScanResult {
    fn add_assign(&mut self, other: Self) {
        self.accumulate(&other);
    }
}

/// Result of decoding one candidate, after the retry policy has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    pub index: usize,
    /// Decode calls made for this candidate (1, or 2 after an ECC retry).
    pub attempts: u8,
    pub flipped: bool,
    pub result: Result<DecodedPayload, DecodeError>,
}

impl CandidateOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
