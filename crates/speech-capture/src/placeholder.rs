//! Placeholder engines for tests and scripted demos.
//!
//! Neither engine produces sound. Each comes with a probe that records the
//! calls made on the engine and lets the caller raise the signals a real
//! engine would (start, end, error, chunks, stop).

use crate::engine::{CaptureEngine, SpeechEngine, SpeechHandle};
use crate::error::{SessionError, SessionResult, SpeechErrorKind};
use crate::messages::{SessionId, SignalSender};
use crate::request::Utterance;
use crate::voice::{VoiceId, VoiceInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call made on [`PlaceholderSpeechEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechCall {
    Start {
        session: SessionId,
        text: String,
        voice: Option<VoiceId>,
        rate: f32,
        pitch: f32,
        volume: f32,
    },
    Pause(SpeechHandle),
    Resume(SpeechHandle),
    Cancel(SpeechHandle),
}

#[derive(Debug)]
struct SpeechShared {
    available: bool,
    voices: Vec<VoiceInfo>,
    calls: Vec<SpeechCall>,
    signals: Option<SignalSender>,
    catalog_watcher: Option<SignalSender>,
    active: Option<(SessionId, SpeechHandle)>,
    fail_start: Option<SpeechErrorKind>,
    next_handle: u64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Speech engine that only records what it is asked to do.
///
/// Cancelling an utterance raises a `canceled` error for it, as browser
/// engines do, so callers see the same late signal they would in production.
pub struct PlaceholderSpeechEngine {
    shared: Arc<Mutex<SpeechShared>>,
}

/// Test-side view of a [`PlaceholderSpeechEngine`]
#[derive(Clone)]
pub struct SpeechProbe {
    shared: Arc<Mutex<SpeechShared>>,
}

impl PlaceholderSpeechEngine {
    pub fn new() -> (Self, SpeechProbe) {
        Self::build(true)
    }

    /// An engine that reports itself unavailable.
    pub fn unavailable() -> (Self, SpeechProbe) {
        Self::build(false)
    }

    fn build(available: bool) -> (Self, SpeechProbe) {
        let shared = Arc::new(Mutex::new(SpeechShared {
            available,
            voices: Vec::new(),
            calls: Vec::new(),
            signals: None,
            catalog_watcher: None,
            active: None,
            fail_start: None,
            next_handle: 0,
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            SpeechProbe { shared },
        )
    }
}

impl SpeechEngine for PlaceholderSpeechEngine {
    fn is_available(&self) -> bool {
        lock(&self.shared).available
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        lock(&self.shared).voices.clone()
    }

    fn watch_catalog(&mut self, signals: SignalSender) {
        lock(&self.shared).catalog_watcher = Some(signals);
    }

    fn start(
        &mut self,
        session: SessionId,
        utterance: &Utterance,
        signals: SignalSender,
    ) -> Result<SpeechHandle, SpeechErrorKind> {
        let mut shared = lock(&self.shared);
        shared.calls.push(SpeechCall::Start {
            session,
            text: utterance.text.clone(),
            voice: utterance.voice.as_ref().map(|v| v.id.clone()),
            rate: utterance.rate,
            pitch: utterance.pitch,
            volume: utterance.volume,
        });
        if let Some(kind) = shared.fail_start.take() {
            return Err(kind);
        }
        shared.next_handle += 1;
        let handle = SpeechHandle(shared.next_handle);
        shared.active = Some((session, handle));
        shared.signals = Some(signals);
        Ok(handle)
    }

    fn pause(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind> {
        lock(&self.shared).calls.push(SpeechCall::Pause(handle));
        Ok(())
    }

    fn resume(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind> {
        lock(&self.shared).calls.push(SpeechCall::Resume(handle));
        Ok(())
    }

    fn cancel(&mut self, handle: SpeechHandle) {
        let mut shared = lock(&self.shared);
        shared.calls.push(SpeechCall::Cancel(handle));
        if let Some((session, active)) = shared.active {
            if active == handle {
                shared.active = None;
                if let Some(signals) = &shared.signals {
                    signals.speech_failed(session, SpeechErrorKind::Canceled);
                }
            }
        }
    }
}

impl SpeechProbe {
    pub fn calls(&self) -> Vec<SpeechCall> {
        lock(&self.shared).calls.clone()
    }

    pub fn start_count(&self) -> usize {
        lock(&self.shared)
            .calls
            .iter()
            .filter(|c| matches!(c, SpeechCall::Start { .. }))
            .count()
    }

    /// Session of the utterance currently "speaking", if any.
    pub fn active_session(&self) -> Option<SessionId> {
        lock(&self.shared).active.map(|(session, _)| session)
    }

    /// Make the next `start` fail with `kind`.
    pub fn fail_next_start(&self, kind: SpeechErrorKind) {
        lock(&self.shared).fail_start = Some(kind);
    }

    /// Replace the voice list and raise `CatalogChanged`.
    pub fn set_voices(&self, voices: Vec<VoiceInfo>) {
        let mut shared = lock(&self.shared);
        shared.voices = voices;
        if let Some(watcher) = &shared.catalog_watcher {
            watcher.catalog_changed();
        }
    }

    pub fn signal_start(&self) {
        self.with_active(|signals, session| signals.speech_started(session));
    }

    /// Finish the active utterance.
    pub fn signal_end(&self) {
        let mut shared = lock(&self.shared);
        if let (Some((session, _)), Some(signals)) = (shared.active.take(), &shared.signals) {
            signals.speech_ended(session);
        }
    }

    pub fn signal_error(&self, kind: SpeechErrorKind) {
        let mut shared = lock(&self.shared);
        if let (Some((session, _)), Some(signals)) = (shared.active.take(), &shared.signals) {
            signals.speech_failed(session, kind);
        }
    }

    /// Raise an end signal for an arbitrary (possibly superseded) session.
    pub fn signal_end_for(&self, session: SessionId) {
        if let Some(signals) = &lock(&self.shared).signals {
            signals.speech_ended(session);
        }
    }

    fn with_active(&self, f: impl FnOnce(&SignalSender, SessionId)) {
        let shared = lock(&self.shared);
        if let (Some((session, _)), Some(signals)) = (shared.active, &shared.signals) {
            f(signals, session);
        }
    }
}

/// A call made on [`PlaceholderCaptureEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCall {
    Start(SessionId),
    Stop(SessionId),
    Abort(SessionId),
}

#[derive(Debug)]
struct CaptureShared {
    mime_type: String,
    calls: Vec<CaptureCall>,
    signals: Option<SignalSender>,
    recording: Option<SessionId>,
    /// Chunks still buffered inside the "recorder", delivered on stop
    pending: Vec<Vec<u8>>,
    fail_start: Option<String>,
}

/// Capture engine whose chunks are supplied through its probe.
pub struct PlaceholderCaptureEngine {
    shared: Arc<Mutex<CaptureShared>>,
}

/// Test-side view of a [`PlaceholderCaptureEngine`]
#[derive(Clone)]
pub struct CaptureProbe {
    shared: Arc<Mutex<CaptureShared>>,
}

impl PlaceholderCaptureEngine {
    pub fn new() -> (Self, CaptureProbe) {
        Self::with_mime_type("audio/wav")
    }

    pub fn with_mime_type(mime_type: impl Into<String>) -> (Self, CaptureProbe) {
        let shared = Arc::new(Mutex::new(CaptureShared {
            mime_type: mime_type.into(),
            calls: Vec::new(),
            signals: None,
            recording: None,
            pending: Vec::new(),
            fail_start: None,
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            CaptureProbe { shared },
        )
    }
}

impl CaptureEngine for PlaceholderCaptureEngine {
    fn mime_type(&self) -> String {
        lock(&self.shared).mime_type.clone()
    }

    fn start(&mut self, session: SessionId, signals: SignalSender) -> SessionResult<()> {
        let mut shared = lock(&self.shared);
        shared.calls.push(CaptureCall::Start(session));
        if let Some(reason) = shared.fail_start.take() {
            return Err(SessionError::CaptureEngine(reason));
        }
        shared.recording = Some(session);
        shared.pending.clear();
        shared.signals = Some(signals);
        Ok(())
    }

    fn stop(&mut self, session: SessionId) {
        let mut shared = lock(&self.shared);
        shared.calls.push(CaptureCall::Stop(session));
        if shared.recording != Some(session) {
            return;
        }
        shared.recording = None;
        let pending = std::mem::take(&mut shared.pending);
        if let Some(signals) = &shared.signals {
            for bytes in pending {
                signals.chunk(session, bytes);
            }
            signals.capture_stopped(session);
        }
    }

    fn abort(&mut self, session: SessionId) {
        let mut shared = lock(&self.shared);
        shared.calls.push(CaptureCall::Abort(session));
        if shared.recording == Some(session) {
            shared.recording = None;
            shared.pending.clear();
        }
    }
}

impl CaptureProbe {
    pub fn calls(&self) -> Vec<CaptureCall> {
        lock(&self.shared).calls.clone()
    }

    pub fn recording(&self) -> Option<SessionId> {
        lock(&self.shared).recording
    }

    pub fn fail_next_start(&self, reason: impl Into<String>) {
        lock(&self.shared).fail_start = Some(reason.into());
    }

    /// Deliver a chunk for the active recording right away.
    pub fn emit_chunk(&self, bytes: &[u8]) {
        let shared = lock(&self.shared);
        if let (Some(session), Some(signals)) = (shared.recording, &shared.signals) {
            signals.chunk(session, bytes.to_vec());
        }
    }

    /// Deliver a chunk tagged with an arbitrary session.
    pub fn emit_chunk_for(&self, session: SessionId, bytes: &[u8]) {
        if let Some(signals) = &lock(&self.shared).signals {
            signals.chunk(session, bytes.to_vec());
        }
    }

    /// Keep a chunk inside the recorder until the next graceful stop flushes it.
    pub fn hold_chunk(&self, bytes: &[u8]) {
        let mut shared = lock(&self.shared);
        if shared.recording.is_some() {
            shared.pending.push(bytes.to_vec());
        }
    }

    /// Report a recorder failure for the active recording.
    pub fn fail(&self, reason: &str) {
        let mut shared = lock(&self.shared);
        if let (Some(session), Some(signals)) = (shared.recording.take(), &shared.signals) {
            signals.capture_failed(session, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Input, Signal};

    #[test]
    fn stop_flushes_held_chunks_before_stopped() {
        let (mut engine, probe) = PlaceholderCaptureEngine::new();
        let (signals, mut rx) = SignalSender::channel();
        let id = SessionId(1);
        engine.start(id, signals).unwrap();
        probe.hold_chunk(b"tail");
        engine.stop(id);

        let mut seen = Vec::new();
        while let Ok(Input::Signal(s)) = rx.try_recv() {
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![
                Signal::ChunkAvailable { session: id, bytes: b"tail".to_vec() },
                Signal::CaptureStopped { session: id },
            ]
        );
    }

    #[test]
    fn cancel_raises_canceled_error() {
        let (mut engine, probe) = PlaceholderSpeechEngine::new();
        let (signals, mut rx) = SignalSender::channel();
        let utterance = Utterance {
            text: "hi".into(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        };
        let handle = engine.start(SessionId(5), &utterance, signals).unwrap();
        engine.cancel(handle);
        assert!(probe.active_session().is_none());
        match rx.try_recv() {
            Ok(Input::Signal(Signal::SpeechFailed { session, kind })) => {
                assert_eq!(session, SessionId(5));
                assert_eq!(kind, SpeechErrorKind::Canceled);
            }
            other => panic!("unexpected input: {:?}", other),
        }
    }
}
