use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::{CaptureError, SessionError};
use crate::models::input::{InputEvent, TriggerSpec};
use crate::models::scan_result::ScanResult;
use crate::models::state::SessionState;
use crate::processing::cpu_clock::{CpuClock, ProcessCpuClock};
use crate::processing::orchestrator::DecodeOrchestrator;
use crate::session::stop::StopSignal;
use crate::traits::decode_engine::DecodeEngine;
use crate::traits::event_source::EventSource;
use crate::traits::frame_source::FrameSource;
use crate::traits::result_sink::ResultSink;
use crate::traits::session_delegate::SessionDelegate;

/// Mutable session state shared with [`SessionHandle`]s.
struct SessionInner {
    state: SessionState,
    totals: ScanResult,
    triggers: u64,
    timeouts: u64,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            totals: ScanResult::default(),
            triggers: 0,
            timeouts: 0,
        }
    }
}

/// Read-only view of a running session, usable from other threads.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
    stop: StopSignal,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    /// Totals over every completed cycle so far.
    pub fn totals(&self) -> ScanResult {
        self.inner.lock().totals
    }

    pub fn triggers(&self) -> u64 {
        self.inner.lock().triggers
    }

    pub fn timeouts(&self) -> u64 {
        self.inner.lock().timeouts
    }

    /// Ask the session to stop at its next poll slice.
    pub fn stop(&self) {
        self.stop.stop();
    }
}

/// Event-driven scan loop.
///
/// ```text
/// [EventSource] → trigger? → [FrameSource].capture → [DecodeOrchestrator] → [ResultSink]
///                    ↑                                                        │
///                    └────────────────────── waiting ←────────────────────────┘
/// ```
///
/// Cycles run strictly one after another on the calling thread. A capture
/// timeout skips the cycle; any other capture or engine error ends the
/// session in `Failed`.
pub struct TriggerSession<S, E, I, K, C = ProcessCpuClock>
where
    S: FrameSource,
    E: DecodeEngine,
    I: EventSource,
    K: ResultSink,
    C: CpuClock,
{
    source: S,
    orchestrator: DecodeOrchestrator<E, C>,
    events: I,
    sink: K,
    trigger: TriggerSpec,
    stop: StopSignal,
    inner: Arc<Mutex<SessionInner>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<S, E, I, K, C> TriggerSession<S, E, I, K, C>
where
    S: FrameSource,
    E: DecodeEngine,
    I: EventSource,
    K: ResultSink,
    C: CpuClock,
{
    pub fn new(source: S, orchestrator: DecodeOrchestrator<E, C>, events: I, sink: K, trigger: TriggerSpec) -> Self {
        Self {
            source,
            orchestrator,
            events,
            sink,
            trigger,
            stop: StopSignal::new(),
            inner: Arc::new(Mutex::new(SessionInner::new())),
            delegate: None,
        }
    }

    /// Use an externally owned stop signal (e.g. one raised by a signal handler).
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            inner: Arc::clone(&self.inner),
            stop: self.stop.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state.clone()
    }

    pub fn totals(&self) -> ScanResult {
        self.inner.lock().totals
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn orchestrator(&self) -> &DecodeOrchestrator<E, C> {
        &self.orchestrator
    }

    /// Wait for trigger events and scan until stopped or the event stream
    /// ends. Returns the accumulated totals.
    ///
    /// The frame source is closed on every exit path.
    pub fn run(&mut self) -> Result<ScanResult, SessionError> {
        if self.state().is_terminal() {
            return Err(SessionError::Configuration("session has already finished".into()));
        }

        log::info!("waiting for trigger (type {}, code {})", self.trigger.event_type, self.trigger.code);
        self.set_state(SessionState::Waiting);

        let outcome = self.event_loop();
        self.finish(outcome)
    }

    /// Run a single cycle immediately, without waiting for a trigger.
    ///
    /// Returns `Ok(None)` when the capture timed out or was cancelled. A
    /// fatal error closes the source and leaves the session `Failed`.
    pub fn run_once_now(&mut self) -> Result<Option<ScanResult>, SessionError> {
        if self.state().is_terminal() {
            return Err(SessionError::Configuration("session has already finished".into()));
        }
        self.inner.lock().triggers += 1;

        match self.run_cycle() {
            Ok(result) => Ok(result),
            Err(e) => self.finish(Err(e)).map(|_| None),
        }
    }

    /// Close the source and mark the session stopped. Returns the totals.
    pub fn shutdown(&mut self) -> Result<ScanResult, SessionError> {
        if self.state().is_terminal() {
            return Ok(self.totals());
        }
        self.finish(Ok(()))
    }

    /// Handle one input event. Anything but the trigger is discarded.
    pub fn handle_event(&mut self, event: &InputEvent) -> Result<Option<ScanResult>, SessionError> {
        if !self.trigger.matches(event) {
            log::trace!(
                "ignoring event type {} code {} value {}",
                event.event_type,
                event.code,
                event.value
            );
            return Ok(None);
        }

        let triggers = {
            let mut inner = self.inner.lock();
            inner.triggers += 1;
            inner.triggers
        };
        log::info!("trigger #{}: capturing", triggers);
        self.run_cycle()
    }

    /// Capture one frame and scan it.
    pub fn run_cycle(&mut self) -> Result<Option<ScanResult>, SessionError> {
        Self::publish(&self.inner, &self.delegate, SessionState::Capturing);

        let frame = match self.source.capture(&self.stop) {
            Ok(frame) => frame,
            Err(CaptureError::Cancelled) => {
                log::debug!("capture cancelled");
                Self::publish(&self.inner, &self.delegate, SessionState::Waiting);
                return Ok(None);
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("{}, skipping cycle", e);
                self.inner.lock().timeouts += 1;
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&SessionError::Capture(e));
                }
                Self::publish(&self.inner, &self.delegate, SessionState::Waiting);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Self::publish(&self.inner, &self.delegate, SessionState::Scanning);
        log::debug!("frame {} captured ({})", frame.sequence(), frame.resolution());
        let result = self.orchestrator.scan(&frame, &mut self.sink)?;

        let totals = {
            let mut inner = self.inner.lock();
            inner.totals += result;
            inner.totals
        };
        log::debug!(
            "totals: {} frames, {}/{} decoded, mean detection {:.1} ms",
            totals.frame_count,
            totals.successfully_decoded,
            totals.candidates_found,
            totals.mean_detection_ms()
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_scan_finished(&result);
        }

        Self::publish(&self.inner, &self.delegate, SessionState::Waiting);
        Ok(Some(result))
    }

    fn event_loop(&mut self) -> Result<(), SessionError> {
        loop {
            if self.stop.is_stopped() {
                log::info!("stop requested");
                return Ok(());
            }
            let Some(event) = self.events.next_event(&self.stop)? else {
                log::info!("event stream ended");
                return Ok(());
            };
            self.handle_event(&event)?;
        }
    }

    fn finish(&mut self, outcome: Result<(), SessionError>) -> Result<ScanResult, SessionError> {
        if let Err(e) = self.source.close() {
            log::warn!("failed to close frame source: {}", e);
        }

        match outcome {
            Ok(()) => {
                self.set_state(SessionState::Stopped);
                Ok(self.totals())
            }
            Err(e) => {
                log::error!("session failed: {}", e);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
                self.set_state(SessionState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn set_state(&self, new_state: SessionState) {
        Self::publish(&self.inner, &self.delegate, new_state);
    }

    fn publish(inner: &Mutex<SessionInner>, delegate: &Option<Arc<dyn SessionDelegate>>, new_state: SessionState) {
        {
            let mut s = inner.lock();
            s.state = new_state.clone();
        }
        if let Some(ref delegate) = delegate {
            delegate.on_state_changed(&new_state);
        }
    }
}
