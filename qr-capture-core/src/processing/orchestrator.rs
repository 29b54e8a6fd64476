use crate::models::error::EngineError;
use crate::models::frame::FrameView;
use crate::models::scan_result::{CandidateOutcome, ScanResult};
use crate::processing::cpu_clock::{CpuClock, ProcessCpuClock};
use crate::traits::decode_engine::DecodeEngine;
use crate::traits::result_sink::ResultSink;

/// Drives one scan cycle over a decode engine it owns exclusively.
///
/// ```text
/// [FrameView] → resize → begin/copy → end (timed) → for each candidate:
///     extract → decode ─(ECC error)→ flip → decode → [ResultSink]
/// ```
///
/// The engine's canvas and candidate list are mutated in place, so the
/// orchestrator is `&mut self` throughout and cannot run two cycles at once.
pub struct DecodeOrchestrator<E: DecodeEngine, C: CpuClock = ProcessCpuClock> {
    engine: E,
    clock: C,
}

impl<E: DecodeEngine> DecodeOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self::with_clock(engine, ProcessCpuClock)
    }
}

impl<E: DecodeEngine, C: CpuClock> DecodeOrchestrator<E, C> {
    pub fn with_clock(engine: E, clock: C) -> Self {
        Self { engine, clock }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Scan one frame and report every candidate to `sink`.
    ///
    /// The sink is told a cycle is starting before anything else happens.
    /// Decoded payloads go to `emit`, failures to `emit_error`, and the
    /// summary to `summary`. A sink write failure is logged and the cycle
    /// carries on. Engine errors abort the cycle.
    pub fn scan(&mut self, frame: &FrameView<'_>, sink: &mut dyn ResultSink) -> Result<ScanResult, EngineError> {
        sink.start_cycle();
        let result = self.scan_with(frame, |outcome| match &outcome.result {
            Ok(payload) => {
                log::info!("candidate {}: decode successful: {}", outcome.index, payload.as_text());
                if let Err(e) = sink.emit(&payload.bytes) {
                    log::warn!("candidate {}: failed to forward payload: {}", outcome.index, e);
                }
            }
            Err(reason) => {
                log::warn!("candidate {}: ERROR: {}", outcome.index, reason);
                sink.emit_error(outcome.index, reason);
            }
        })?;

        sink.summary(result);
        Ok(result)
    }

    /// Scan one frame, handing each candidate outcome to `on_candidate` in
    /// index order.
    pub fn scan_with<F>(&mut self, frame: &FrameView<'_>, mut on_candidate: F) -> Result<ScanResult, EngineError>
    where
        F: FnMut(&CandidateOutcome),
    {
        let resolution = frame.resolution();
        if !frame.is_well_formed() {
            return Err(EngineError::FrameSizeMismatch {
                expected: resolution.byte_len(),
                actual: frame.data().len(),
            });
        }

        self.engine.resize(resolution)?;
        self.engine.load(frame.data())?;

        let start = self.clock.now_ms();
        self.engine.end()?;
        let detection_duration_ms = self.clock.now_ms().saturating_sub(start);

        let count = self.engine.candidate_count();
        log::info!("ID Time = {} ms", detection_duration_ms);
        log::info!("Count = {}", count);

        let mut result = ScanResult {
            frame_count: 1,
            candidates_found: count as u32,
            successfully_decoded: 0,
            detection_duration_ms,
        };

        for index in 0..count {
            let outcome = self.decode_candidate(index)?;
            if outcome.is_success() {
                result.successfully_decoded += 1;
            }
            on_candidate(&outcome);
        }

        Ok(result)
    }

    /// Extract and decode one candidate, retrying once with a flipped grid
    /// when (and only when) the first attempt fails data ECC.
    fn decode_candidate(&self, index: usize) -> Result<CandidateOutcome, EngineError> {
        let mut code = self.engine.extract(index)?;

        let first = self.engine.decode(&code);
        let retry = matches!(&first, Err(e) if e.is_ecc());
        if !retry {
            return Ok(CandidateOutcome {
                index,
                attempts: 1,
                flipped: false,
                result: first,
            });
        }

        log::debug!("candidate {}: ECC failure, retrying with flipped grid", index);
        code.flip();
        Ok(CandidateOutcome {
            index,
            attempts: 2,
            flipped: true,
            result: self.engine.decode(&code),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::models::code::{DecodedPayload, ExtractedCode, Point};
    use crate::models::error::DecodeError;
    use crate::models::frame::{OwnedFrame, Resolution};
    use crate::processing::staging::StagingCanvas;
    use crate::sinks::memory::MemorySink;

    /// What decoding a candidate does on the first and (flipped) second attempt.
    #[derive(Clone, Copy)]
    enum Script {
        Clean(&'static str),
        Fails(DecodeError),
        EccThenOk(&'static str),
        EccThenFails(DecodeError),
    }

    struct ScriptedEngine {
        canvas: StagingCanvas,
        scripts: Vec<Script>,
        detected: usize,
        resizes: Cell<usize>,
        decode_calls: RefCell<Vec<(usize, bool)>>,
        fail_extract_at: Option<usize>,
    }

    impl ScriptedEngine {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                canvas: StagingCanvas::default(),
                scripts,
                detected: 0,
                resizes: Cell::new(0),
                decode_calls: RefCell::new(Vec::new()),
                fail_extract_at: None,
            }
        }

        fn calls_for(&self, index: usize) -> usize {
            self.decode_calls.borrow().iter().filter(|(i, _)| *i == index).count()
        }
    }

    impl DecodeEngine for ScriptedEngine {
        fn resize(&mut self, resolution: Resolution) -> Result<(), EngineError> {
            self.resizes.set(self.resizes.get() + 1);
            self.canvas.resize(resolution).map(|_| ())
        }

        fn resolution(&self) -> Resolution {
            self.canvas.resolution()
        }

        fn begin(&mut self) -> &mut [u8] {
            self.canvas.pixels_mut()
        }

        fn end(&mut self) -> Result<(), EngineError> {
            self.detected = self.scripts.len();
            Ok(())
        }

        fn candidate_count(&self) -> usize {
            self.detected
        }

        fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError> {
            if index >= self.detected || self.fail_extract_at == Some(index) {
                return Err(EngineError::CandidateOutOfRange {
                    index,
                    count: self.detected,
                });
            }
            // The candidate index rides in the first corner; a marker module
            // at (0, 1) moves to (1, 0) when the grid is flipped.
            let corners = [Point { x: index as i32, y: 0 }; 4];
            Ok(ExtractedCode::from_fn(21, corners, |x, y| x == 0 && y == 1))
        }

        fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError> {
            let index = code.corners()[0].x as usize;
            let flipped = code.bit(1, 0);
            self.decode_calls.borrow_mut().push((index, flipped));

            let ok = |text: &str| Ok(DecodedPayload::new(text.as_bytes().to_vec()));
            match (self.scripts[index], flipped) {
                (Script::Clean(text), false) => ok(text),
                (Script::Fails(e), false) => Err(e),
                (Script::EccThenOk(_), false) | (Script::EccThenFails(_), false) => Err(DecodeError::DataEcc),
                (Script::EccThenOk(text), true) => ok(text),
                (Script::EccThenFails(e), true) => Err(e),
                (_, true) => Err(DecodeError::InvalidGridSize),
            }
        }
    }

    /// Returns queued readings in order, then repeats the last one.
    struct SteppedClock(RefCell<Vec<u64>>);

    impl SteppedClock {
        fn new(readings: &[u64]) -> Self {
            let mut readings = readings.to_vec();
            readings.reverse();
            Self(RefCell::new(readings))
        }
    }

    impl CpuClock for SteppedClock {
        fn now_ms(&self) -> u64 {
            let mut readings = self.0.borrow_mut();
            if readings.len() > 1 {
                readings.pop().unwrap()
            } else {
                readings[0]
            }
        }
    }

    fn frame() -> OwnedFrame {
        OwnedFrame::filled(Resolution::new(64, 48), 255)
    }

    #[test]
    fn blank_frame_reports_nothing() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![]));
        let mut sink = MemorySink::new();

        let result = orchestrator.scan(&frame().view(), &mut sink).unwrap();

        assert_eq!(result.frame_count, 1);
        assert_eq!(result.candidates_found, 0);
        assert_eq!(result.successfully_decoded, 0);
        assert!(sink.payloads.is_empty());
        assert!(sink.errors.is_empty());
        assert_eq!(sink.summaries, vec![result]);
    }

    #[test]
    fn frame_is_copied_into_resized_canvas() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![]));
        let mut data = vec![0u8; 64 * 48];
        data[64 * 10 + 3] = 42;
        let frame = OwnedFrame::new(data, Resolution::new(64, 48));

        orchestrator.scan(&frame.view(), &mut MemorySink::new()).unwrap();
        orchestrator.scan(&frame.view(), &mut MemorySink::new()).unwrap();

        let engine = orchestrator.engine();
        assert_eq!(engine.resolution(), Resolution::new(64, 48));
        assert_eq!(engine.canvas.pixel(3, 10), 42);
        assert_eq!(engine.resizes.get(), 2);
    }

    /// Engine whose `resize` leaves the canvas at a fixed size.
    struct StuckCanvasEngine(ScriptedEngine);

    impl DecodeEngine for StuckCanvasEngine {
        fn resize(&mut self, _resolution: Resolution) -> Result<(), EngineError> {
            Ok(())
        }

        fn resolution(&self) -> Resolution {
            self.0.resolution()
        }

        fn begin(&mut self) -> &mut [u8] {
            self.0.begin()
        }

        fn end(&mut self) -> Result<(), EngineError> {
            self.0.end()
        }

        fn candidate_count(&self) -> usize {
            self.0.candidate_count()
        }

        fn extract(&self, index: usize) -> Result<ExtractedCode, EngineError> {
            self.0.extract(index)
        }

        fn decode(&self, code: &ExtractedCode) -> Result<DecodedPayload, DecodeError> {
            self.0.decode(code)
        }
    }

    #[test]
    fn canvas_size_disagreement_aborts_before_detection() {
        let mut engine = ScriptedEngine::new(vec![Script::Clean("X")]);
        engine.canvas = StagingCanvas::new(Resolution::new(8, 8));
        let mut orchestrator = DecodeOrchestrator::new(StuckCanvasEngine(engine));
        let mut sink = MemorySink::new();

        let err = orchestrator.scan(&frame().view(), &mut sink).unwrap_err();

        assert_eq!(
            err,
            EngineError::FrameSizeMismatch {
                expected: 64,
                actual: 64 * 48
            }
        );
        assert_eq!(orchestrator.engine().0.candidate_count(), 0);
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn wrong_sized_frame_is_rejected_before_copy() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![Script::Clean("X")]));
        let short = vec![9u8; 64 * 48 - 1];
        let view = FrameView::new(&short, Resolution::new(64, 48), 0);
        let mut sink = MemorySink::new();

        let err = orchestrator.scan(&view, &mut sink).unwrap_err();

        assert_eq!(
            err,
            EngineError::FrameSizeMismatch {
                expected: 64 * 48,
                actual: 64 * 48 - 1
            }
        );
        let engine = orchestrator.engine();
        assert_eq!(engine.resizes.get(), 0);
        assert!(engine.canvas.pixels().iter().all(|&p| p == 0));
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn clean_symbol_decodes_once() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![Script::Clean("HELLO")]));
        let mut sink = MemorySink::new();

        let result = orchestrator.scan(&frame().view(), &mut sink).unwrap();

        assert_eq!(result.candidates_found, 1);
        assert_eq!(result.successfully_decoded, 1);
        assert_eq!(sink.payloads, vec![b"HELLO".to_vec()]);
        assert_eq!(orchestrator.engine().calls_for(0), 1);
    }

    #[test]
    fn ecc_failure_is_retried_once_with_flip() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![Script::EccThenOk("MIRROR")]));
        let mut outcomes = Vec::new();

        let result = orchestrator
            .scan_with(&frame().view(), |o| outcomes.push(o.clone()))
            .unwrap();

        assert_eq!(result.successfully_decoded, 1);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].attempts, 2);
        assert!(outcomes[0].flipped);
        assert_eq!(
            *orchestrator.engine().decode_calls.borrow(),
            vec![(0, false), (0, true)]
        );
    }

    #[test]
    fn failed_retry_counts_as_failure() {
        let mut orchestrator =
            DecodeOrchestrator::new(ScriptedEngine::new(vec![Script::EccThenFails(DecodeError::DataEcc)]));
        let mut sink = MemorySink::new();

        let result = orchestrator.scan(&frame().view(), &mut sink).unwrap();

        assert_eq!(result.candidates_found, 1);
        assert_eq!(result.successfully_decoded, 0);
        assert!(sink.payloads.is_empty());
        assert_eq!(sink.errors, vec![(0, DecodeError::DataEcc)]);
        // Still only two decodes even though the retry failed ECC again.
        assert_eq!(orchestrator.engine().calls_for(0), 2);
    }

    #[test]
    fn non_ecc_failures_are_never_retried() {
        let failures = [
            DecodeError::InvalidGridSize,
            DecodeError::InvalidVersion,
            DecodeError::FormatEcc,
            DecodeError::UnknownDataType,
            DecodeError::DataOverflow,
            DecodeError::DataUnderflow,
        ];
        let scripts = failures.iter().map(|&e| Script::Fails(e)).collect();
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(scripts));
        let mut sink = MemorySink::new();

        let result = orchestrator.scan(&frame().view(), &mut sink).unwrap();

        assert_eq!(result.candidates_found, failures.len() as u32);
        assert_eq!(result.successfully_decoded, 0);
        for index in 0..failures.len() {
            assert_eq!(orchestrator.engine().calls_for(index), 1);
        }
        let reported: Vec<_> = sink.errors.iter().map(|(_, e)| *e).collect();
        assert_eq!(reported, failures.to_vec());
    }

    #[test]
    fn mixed_candidates_are_reported_in_index_order() {
        let mut orchestrator = DecodeOrchestrator::new(ScriptedEngine::new(vec![
            Script::Fails(DecodeError::FormatEcc),
            Script::Clean("A"),
            Script::EccThenOk("B"),
            Script::EccThenFails(DecodeError::DataUnderflow),
        ]));
        let mut outcomes = Vec::new();

        let result = orchestrator
            .scan_with(&frame().view(), |o| outcomes.push(o.clone()))
            .unwrap();

        assert_eq!(outcomes.len() as u32, result.candidates_found);
        assert!(result.successfully_decoded <= result.candidates_found);
        assert_eq!(result.successfully_decoded, 2);
        let indices: Vec<_> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let attempts: Vec<_> = outcomes.iter().map(|o| o.attempts).collect();
        assert_eq!(attempts, vec![1, 1, 2, 2]);
        assert_eq!(outcomes[3].result, Err(DecodeError::DataUnderflow));
    }

    #[test]
    fn extraction_error_aborts_the_cycle() {
        let mut engine = ScriptedEngine::new(vec![Script::Clean("A"), Script::Clean("B")]);
        engine.fail_extract_at = Some(1);
        let mut orchestrator = DecodeOrchestrator::new(engine);
        let mut sink = MemorySink::new();

        let err = orchestrator.scan(&frame().view(), &mut sink).unwrap_err();

        assert!(matches!(err, EngineError::CandidateOutOfRange { index: 1, .. }));
        assert_eq!(sink.payloads, vec![b"A".to_vec()]);
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn every_scan_starts_a_sink_cycle() {
        let mut engine = ScriptedEngine::new(vec![Script::Clean("A"), Script::Clean("B")]);
        engine.fail_extract_at = Some(1);
        let mut orchestrator = DecodeOrchestrator::new(engine);
        let mut sink = MemorySink::new();

        assert!(orchestrator.scan(&frame().view(), &mut sink).is_err());
        let short = vec![0u8; 3];
        assert!(orchestrator
            .scan(&FrameView::new(&short, Resolution::new(64, 48), 1), &mut sink)
            .is_err());

        assert_eq!(sink.cycles, 2);
        assert!(sink.summaries.is_empty());
    }

    #[test]
    fn sink_failure_does_not_abort_the_cycle() {
        let mut orchestrator =
            DecodeOrchestrator::new(ScriptedEngine::new(vec![Script::Clean("A"), Script::Clean("B")]));
        let mut sink = MemorySink::failing();

        let result = orchestrator.scan(&frame().view(), &mut sink).unwrap();

        assert_eq!(result.successfully_decoded, 2);
        assert_eq!(sink.summaries.len(), 1);
    }

    #[test]
    fn detection_is_timed_with_the_cpu_clock() {
        let clock = SteppedClock::new(&[1_000, 1_012]);
        let mut orchestrator = DecodeOrchestrator::with_clock(ScriptedEngine::new(vec![]), clock);

        let result = orchestrator.scan(&frame().view(), &mut MemorySink::new()).unwrap();

        assert_eq!(result.detection_duration_ms, 12);
    }
}
