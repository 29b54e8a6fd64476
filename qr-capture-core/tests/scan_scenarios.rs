mod common;

use common::{blank_frame, mirrored_symbol_frame, symbol_frame, CountingEngine, MirroredEngine, VGA};
use qr_capture_core::storage::journal::read_all;
use qr_capture_core::{
    CaptureError, DecodeOrchestrator, FrameSource, InputEvent, JournalingSink, LineSink, MemorySink, ReplayEventSource,
    ReplayFrameSource, RqrrEngine, ScanJournal, SessionState, SourceState, TriggerSession, TriggerSpec,
};

fn press() -> InputEvent {
    InputEvent::key_press(qr_capture_core::models::input::KEY_SCAN)
}

#[test]
fn blank_frame_emits_nothing() {
    let mut orchestrator = DecodeOrchestrator::new(RqrrEngine::default());
    let mut sink = LineSink::new(Vec::new());

    let result = orchestrator.scan(&blank_frame().view(), &mut sink).unwrap();

    assert_eq!(result.frame_count, 1);
    assert_eq!(result.candidates_found, 0);
    assert_eq!(result.successfully_decoded, 0);
    assert!(sink.get_ref().is_empty());
}

#[test]
fn hello_symbol_reaches_the_line() {
    let mut orchestrator = DecodeOrchestrator::new(CountingEngine::new(RqrrEngine::default()));
    let mut sink = LineSink::new(Vec::new());

    let result = orchestrator.scan(&symbol_frame(b"HELLO", 200, 120, 8).view(), &mut sink).unwrap();

    assert_eq!(result.candidates_found, 1);
    assert_eq!(result.successfully_decoded, 1);
    assert_eq!(orchestrator.engine().decodes.get(), 1);
    assert_eq!(sink.into_inner(), b"HELLO\r\n".to_vec());
}

#[test]
fn mirrored_symbol_decodes_after_one_flip() {
    let mut orchestrator = DecodeOrchestrator::new(MirroredEngine::new(vec!["HELLO"]));
    let mut sink = LineSink::new(Vec::new());

    let result = orchestrator.scan(&blank_frame().view(), &mut sink).unwrap();

    assert_eq!(result.candidates_found, 1);
    assert_eq!(result.successfully_decoded, 1);
    assert_eq!(orchestrator.engine().decodes_for(0), 2);
    assert_eq!(*orchestrator.engine().decode_log.borrow(), vec![(0, false), (0, true)]);
    assert_eq!(sink.into_inner(), b"HELLO\r\n".to_vec());
}

#[test]
fn mirrored_camera_image_decodes_after_one_flip() {
    let mut orchestrator = DecodeOrchestrator::new(CountingEngine::new(RqrrEngine::default()));
    let mut outcomes = Vec::new();

    let result = orchestrator
        .scan_with(&mirrored_symbol_frame(b"HELLO", 200, 120, 8).view(), |o| outcomes.push(o.clone()))
        .unwrap();

    assert_eq!(result.candidates_found, 1);
    assert_eq!(result.successfully_decoded, 1);
    assert_eq!(orchestrator.engine().decodes.get(), 2);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].attempts, 2);
    assert!(outcomes[0].flipped);
    assert_eq!(outcomes[0].result.as_ref().unwrap().bytes, b"HELLO".to_vec());
}

#[test]
fn capture_timeout_does_not_scan() {
    let mut frames = ReplayFrameSource::new(VGA);
    frames.push_error(CaptureError::Timeout);
    let mut session = TriggerSession::new(
        frames,
        DecodeOrchestrator::new(CountingEngine::new(RqrrEngine::default())),
        ReplayEventSource::new(vec![press()]),
        MemorySink::new(),
        TriggerSpec::default(),
    );
    let handle = session.handle();

    let totals = session.run().unwrap();

    assert_eq!(handle.timeouts(), 1);
    assert_eq!(totals.frame_count, 0);
    assert_eq!(session.orchestrator().engine().detections.get(), 0);
    assert!(session.sink().summaries.is_empty());
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.source().state(), SourceState::Closed);
}

#[test]
fn triggered_session_journals_every_cycle() {
    let path = std::env::temp_dir().join(format!("qr_capture_scenarios_{}.jsonl", std::process::id()));
    std::fs::remove_file(&path).ok();

    let frames = ReplayFrameSource::from_frames(VGA, vec![symbol_frame(b"HELLO", 100, 100, 8), blank_frame()]);
    let sink = JournalingSink::new(LineSink::new(Vec::new()), ScanJournal::open(&path).unwrap());
    let mut session = TriggerSession::new(
        frames,
        DecodeOrchestrator::new(RqrrEngine::default()),
        ReplayEventSource::new(vec![press(), InputEvent::key_press(30), press()]),
        sink,
        TriggerSpec::default(),
    );

    let totals = session.run().unwrap();

    assert_eq!(totals.frame_count, 2);
    assert_eq!(totals.candidates_found, 1);
    assert_eq!(totals.successfully_decoded, 1);
    assert_eq!(session.sink().inner().get_ref(), &b"HELLO\r\n".to_vec());

    let records = read_all(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].result.successfully_decoded, 1);
    assert_eq!(records[0].payload_digests.len(), 1);
    assert_eq!(records[1].result.candidates_found, 0);

    std::fs::remove_file(&path).ok();
}
