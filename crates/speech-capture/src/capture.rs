//! Capture coordinator
//!
//! Binds one recording to one playback session and assembles the artifact.
//! Publication is a join of two independent events: the speech engine's end
//! signal (`finalize`) and the capture engine's `CaptureStopped`, which
//! arrives only after every chunk of that recording has been delivered.
//! Whichever comes second triggers assembly.

use crate::artifact::{Artifact, ArtifactStore};
use crate::engine::CaptureEngine;
use crate::error::SessionResult;
use crate::messages::{SessionId, SignalSender};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Recording,
    /// Speech ended; waiting for the recorder to drain
    Finalizing,
    Ready,
    Failed,
}

/// Recording bound to one playback session
#[derive(Debug)]
pub struct CaptureSession {
    pub session: SessionId,
    pub state: CaptureState,
    chunks: Vec<Vec<u8>>,
    /// Recorder delivered `CaptureStopped`; no more chunks will come
    drained: bool,
}

impl CaptureSession {
    fn new(session: SessionId, state: CaptureState) -> Self {
        Self {
            session,
            state,
            chunks: Vec::new(),
            drained: false,
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.state, CaptureState::Recording | CaptureState::Finalizing)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    fn fail(&mut self) {
        self.state = CaptureState::Failed;
        self.chunks = Vec::new();
    }
}

pub struct CaptureCoordinator {
    engine: Box<dyn CaptureEngine>,
    current: Option<CaptureSession>,
}

impl CaptureCoordinator {
    pub fn new(engine: Box<dyn CaptureEngine>) -> Self {
        Self {
            engine,
            current: None,
        }
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.current.as_ref()
    }

    pub fn state(&self) -> Option<CaptureState> {
        self.current.as_ref().map(|c| c.state)
    }

    fn open_session(&mut self, session: SessionId) -> Option<&mut CaptureSession> {
        self.current
            .as_mut()
            .filter(|c| c.session == session && c.is_open())
    }

    /// Start recording for `session`, discarding any recording still open.
    ///
    /// Capture is best-effort: on failure the session is marked `Failed`
    /// and the error is returned for reporting, but playback goes on.
    pub fn begin(&mut self, session: SessionId, signals: SignalSender) -> SessionResult<()> {
        if let Some(previous) = self.current.as_ref().map(|c| c.session) {
            self.invalidate(previous);
        }

        match self.engine.start(session, signals) {
            Ok(()) => {
                info!("🎙️ Capture started for session {}", session);
                self.current = Some(CaptureSession::new(session, CaptureState::Recording));
                Ok(())
            }
            Err(e) => {
                warn!("Capture for session {} could not start: {}", session, e);
                self.current = Some(CaptureSession::new(session, CaptureState::Failed));
                Err(e)
            }
        }
    }

    /// Append a fragment for the live recording. Fragments from any other
    /// session are dropped and that recorder is torn down.
    pub fn on_chunk(&mut self, session: SessionId, bytes: Vec<u8>) {
        let is_current = self.current.as_ref().map(|c| c.session) == Some(session);
        if !is_current {
            debug!("Dropping {} byte chunk from stale session {}", bytes.len(), session);
            self.engine.abort(session);
            return;
        }
        match self.open_session(session) {
            Some(capture) if !capture.drained => {
                if !bytes.is_empty() {
                    capture.chunks.push(bytes);
                }
            }
            _ => debug!("Dropping chunk for closed capture {}", session),
        }
    }

    /// Speech for `session` ended cleanly. Publishes right away if the
    /// recorder already drained, otherwise asks it to flush and waits for
    /// `CaptureStopped`. Returns true when an artifact was published.
    pub fn finalize(&mut self, session: SessionId, store: &mut ArtifactStore) -> bool {
        let Some(capture) = self.open_session(session) else {
            debug!("Finalize for session {} ignored (no open capture)", session);
            return false;
        };
        if capture.state == CaptureState::Finalizing {
            return false;
        }
        capture.state = CaptureState::Finalizing;

        if capture.drained {
            return self.assemble(store);
        }
        debug!("Flushing recorder for session {}", session);
        self.engine.stop(session);
        false
    }

    /// Recorder for `session` delivered its last chunk. Returns true when an artifact was published.
    pub fn on_stopped(&mut self, session: SessionId, store: &mut ArtifactStore) -> bool {
        let Some(capture) = self.open_session(session) else {
            debug!("Ignoring stop from session {}", session);
            return false;
        };
        capture.drained = true;
        if capture.state == CaptureState::Finalizing {
            self.assemble(store)
        } else {
            debug!("Recorder for session {} drained before speech ended", session);
            false
        }
    }

    /// Recorder reported a failure. Returns true when it affected the live recording.
    pub fn on_failed(&mut self, session: SessionId, reason: &str) -> bool {
        let Some(capture) = self.open_session(session) else {
            return false;
        };
        warn!("Capture for session {} failed: {}", session, reason);
        capture.fail();
        self.engine.abort(session);
        true
    }

    /// Tear down whatever recording is still open, whichever session owns it.
    pub fn discard_current(&mut self) {
        if let Some(session) = self.current.as_ref().map(|c| c.session) {
            self.invalidate(session);
        }
    }

    /// Tear down the recording for `session` without producing an artifact.
    pub fn invalidate(&mut self, session: SessionId) {
        if let Some(capture) = self.open_session(session) {
            info!("🗑️ Capture for session {} discarded ({} chunks)", session, capture.chunk_count());
            capture.fail();
            self.engine.abort(session);
        }
    }

    fn assemble(&mut self, store: &mut ArtifactStore) -> bool {
        let Some(capture) = self.current.as_mut() else {
            return false;
        };
        let bytes = std::mem::take(&mut capture.chunks).concat();
        if bytes.is_empty() {
            warn!("Capture for session {} recorded nothing; no artifact", capture.session);
            capture.state = CaptureState::Failed;
            return false;
        }

        capture.state = CaptureState::Ready;
        let artifact = Artifact::new(capture.session, bytes, self.engine.mime_type());
        info!("📦 Artifact ready for session {} ({} bytes)", capture.session, artifact.len());
        store.publish(artifact);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::{CaptureCall, CaptureProbe, PlaceholderCaptureEngine};

    fn coordinator() -> (CaptureCoordinator, CaptureProbe, SignalSender) {
        let (engine, probe) = PlaceholderCaptureEngine::new();
        let (signals, _rx) = SignalSender::channel();
        (CaptureCoordinator::new(Box::new(engine)), probe, signals)
    }

    #[test]
    fn publishes_after_end_and_drain() {
        let (mut capture, probe, signals) = coordinator();
        let mut store = ArtifactStore::new();
        let id = SessionId(1);
        capture.begin(id, signals).unwrap();
        capture.on_chunk(id, vec![1, 2]);
        capture.on_chunk(id, vec![]);
        capture.on_chunk(id, vec![3]);

        assert!(!capture.finalize(id, &mut store));
        assert_eq!(capture.state(), Some(CaptureState::Finalizing));
        assert!(probe.calls().contains(&CaptureCall::Stop(id)));
        assert!(!store.is_available());

        capture.on_chunk(id, vec![4]);
        assert!(capture.on_stopped(id, &mut store));
        assert_eq!(capture.state(), Some(CaptureState::Ready));
        assert_eq!(&store.current().unwrap().bytes[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn drain_before_end_waits_for_speech() {
        let (mut capture, _, signals) = coordinator();
        let mut store = ArtifactStore::new();
        let id = SessionId(1);
        capture.begin(id, signals).unwrap();
        capture.on_chunk(id, vec![9]);
        assert!(!capture.on_stopped(id, &mut store));
        capture.on_chunk(id, vec![8]);
        assert!(capture.finalize(id, &mut store));
        assert_eq!(&store.current().unwrap().bytes[..], &[9]);
    }

    #[test]
    fn stale_chunks_are_dropped_and_torn_down() {
        let (mut capture, probe, signals) = coordinator();
        capture.begin(SessionId(1), signals.clone()).unwrap();
        capture.begin(SessionId(2), signals).unwrap();
        assert!(probe.calls().contains(&CaptureCall::Abort(SessionId(1))));

        capture.on_chunk(SessionId(1), vec![1]);
        assert_eq!(capture.session().unwrap().chunk_count(), 0);
        assert_eq!(
            probe.calls().iter().filter(|c| **c == CaptureCall::Abort(SessionId(1))).count(),
            2
        );
    }

    #[test]
    fn invalidated_capture_never_publishes() {
        let (mut capture, _, signals) = coordinator();
        let mut store = ArtifactStore::new();
        let id = SessionId(4);
        capture.begin(id, signals).unwrap();
        capture.on_chunk(id, vec![1]);
        capture.invalidate(id);
        assert!(!capture.finalize(id, &mut store));
        assert!(!capture.on_stopped(id, &mut store));
        assert_eq!(capture.state(), Some(CaptureState::Failed));
        assert!(!store.is_available());
    }

    #[test]
    fn discard_current_drops_finalizing_recording() {
        let (mut capture, probe, signals) = coordinator();
        let mut store = ArtifactStore::new();
        let id = SessionId(1);
        capture.begin(id, signals).unwrap();
        capture.on_chunk(id, vec![5]);
        capture.finalize(id, &mut store);
        capture.discard_current();
        assert!(probe.calls().contains(&CaptureCall::Abort(id)));
        assert!(!capture.on_stopped(id, &mut store));
        assert!(!store.is_available());
    }

    #[test]
    fn failed_start_is_reported() {
        let (mut capture, probe, signals) = coordinator();
        probe.fail_next_start("no monitor device");
        assert!(capture.begin(SessionId(1), signals).is_err());
        assert_eq!(capture.state(), Some(CaptureState::Failed));
    }

    #[test]
    fn empty_recording_publishes_nothing() {
        let (mut capture, _, signals) = coordinator();
        let mut store = ArtifactStore::new();
        let id = SessionId(1);
        capture.begin(id, signals).unwrap();
        capture.finalize(id, &mut store);
        assert!(!capture.on_stopped(id, &mut store));
        assert_eq!(capture.state(), Some(CaptureState::Failed));
        assert!(!store.is_available());
    }
}
