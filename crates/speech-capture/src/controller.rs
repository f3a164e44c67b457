//! Session controller - the single owner of playback, capture and the artifact
//!
//! Commands (`speak`, `pause`, `resume`, `stop`, `download`) and engine
//! signals both land here. Every mutation of the live session goes through
//! this type, and every status change is published on the status channel.

use crate::artifact::{Artifact, ArtifactStore};
use crate::capture::{CaptureCoordinator, CaptureState};
use crate::config::SessionConfig;
use crate::engine::{CaptureEngine, SpeechEngine};
use crate::error::{SessionError, SessionResult, SpeechErrorKind};
use crate::messages::{SessionId, Signal, SignalSender};
use crate::playback::{PlaybackMachine, PlaybackState};
use crate::request::UtteranceRequest;
use crate::status::{ControlState, Status, StatusUpdate};
use crate::voice::VoiceCatalog;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct SessionController {
    config: SessionConfig,
    playback: PlaybackMachine,
    capture: CaptureCoordinator,
    artifacts: ArtifactStore,
    catalog: VoiceCatalog,
    signals: SignalSender,
    status: Status,
    status_tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl SessionController {
    /// Build a controller around the two engines.
    ///
    /// Fails with [`SessionError::UnsupportedEngine`] when the speech engine
    /// is unavailable; the caller should then disable every control.
    pub fn new(
        config: SessionConfig,
        speech: Box<dyn SpeechEngine>,
        capture: Box<dyn CaptureEngine>,
        signals: SignalSender,
    ) -> SessionResult<(Self, mpsc::UnboundedReceiver<StatusUpdate>)> {
        config.validate()?;

        let mut playback = PlaybackMachine::new(speech);
        if !playback.is_available() {
            warn!("Speech engine unavailable; all controls disabled");
            return Err(SessionError::UnsupportedEngine(
                "speech engine reported itself unavailable".to_string(),
            ));
        }
        playback.watch_catalog(signals.clone());
        let catalog = VoiceCatalog::new(playback.voices());
        info!("🎭 Session controller ready ({} voices)", catalog.len());

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let controller = Self {
            config,
            playback,
            capture: CaptureCoordinator::new(capture),
            artifacts: ArtifactStore::new(),
            catalog,
            signals,
            status: Status::Ready,
            status_tx,
        };
        controller.emit();
        Ok((controller, status_rx))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn capture_state(&self) -> Option<CaptureState> {
        self.capture.state()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.playback.current_id()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifacts.current()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn controls(&self) -> ControlState {
        ControlState::derive(&self.playback.state(), self.artifacts.is_available())
    }

    pub fn voices(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Re-query the engine's voice list.
    pub fn refresh_voices(&mut self) {
        self.catalog = VoiceCatalog::new(self.playback.voices());
        debug!("Voice catalog refreshed ({} voices)", self.catalog.len());
    }

    /// Start speaking `request`, superseding any active session.
    pub fn speak(&mut self, request: UtteranceRequest) -> SessionResult<SessionId> {
        let utterance = match request.validate(&self.config, &self.catalog) {
            Ok(u) => u,
            Err(e) => {
                debug!("Speak rejected: {}", e);
                self.set_status(Status::EmptyText);
                return Err(e);
            }
        };

        if let Some(previous) = self.playback.supersede() {
            debug!("Session {} superseded", previous);
        }
        // A finished session may still be draining its recorder.
        self.capture.discard_current();
        self.artifacts.clear();

        let session = match self.playback.begin(utterance, self.signals.clone()) {
            Ok(id) => id,
            Err(kind) => {
                self.set_status(Status::Error(kind.clone()));
                return Err(SessionError::SpeechEngine(kind));
            }
        };
        self.set_status(Status::Speaking);

        if let Err(e) = self.capture.begin(session, self.signals.clone()) {
            warn!("Session {} continues without capture: {}", session, e);
            self.set_status(Status::CaptureUnavailable);
        }
        Ok(session)
    }

    /// Pause if speaking. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        match self.playback.pause() {
            Ok(true) => {
                self.set_status(Status::Paused);
                true
            }
            Ok(false) => false,
            Err(kind) => {
                self.fail_session(kind);
                true
            }
        }
    }

    /// Resume if paused. Returns whether anything changed.
    pub fn resume(&mut self) -> bool {
        match self.playback.resume() {
            Ok(true) => {
                self.set_status(Status::Speaking);
                true
            }
            Ok(false) => false,
            Err(kind) => {
                self.fail_session(kind);
                true
            }
        }
    }

    /// Stop if speaking or paused; the recording is discarded.
    pub fn stop(&mut self) -> bool {
        match self.playback.stop() {
            Some(session) => {
                self.capture.invalidate(session);
                self.set_status(Status::Stopped);
                true
            }
            None => false,
        }
    }

    /// The current artifact, or [`SessionError::NoArtifactAvailable`].
    pub fn download(&mut self) -> SessionResult<Artifact> {
        match self.artifacts.download() {
            Ok(artifact) => Ok(artifact.clone()),
            Err(e) => {
                self.set_status(Status::NoAudioAvailable);
                Err(e)
            }
        }
    }

    /// Record that the artifact was saved by the view layer.
    pub fn report_downloaded(&mut self, path: &Path) {
        info!("Audio downloaded to {}", path.display());
        self.set_status(Status::Downloaded);
    }

    /// Apply one engine signal. Signals for superseded or finished sessions are dropped.
    pub fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::SpeechStarted { session } => {
                if self.playback.on_started(session) {
                    debug!("Session {} audible", session);
                } else {
                    self.drop_stale("start", session);
                }
            }
            Signal::SpeechEnded { session } => {
                if self.playback.on_ended(session) {
                    self.set_status(Status::Finished);
                    if self.capture.finalize(session, &mut self.artifacts) {
                        self.set_status(Status::AudioReady);
                    }
                } else {
                    self.drop_stale("end", session);
                }
            }
            Signal::SpeechFailed { session, kind } => {
                if self.playback.on_error(session, kind.clone()) {
                    self.capture.invalidate(session);
                    self.set_status(Status::Error(kind));
                } else {
                    self.drop_stale("error", session);
                }
            }
            Signal::ChunkAvailable { session, bytes } => {
                self.capture.on_chunk(session, bytes);
            }
            Signal::CaptureStopped { session } => {
                if self.capture.on_stopped(session, &mut self.artifacts) {
                    self.set_status(Status::AudioReady);
                }
            }
            Signal::CaptureFailed { session, reason } => {
                if self.capture.on_failed(session, &reason) {
                    self.set_status(Status::CaptureUnavailable);
                }
            }
            Signal::CatalogChanged => self.refresh_voices(),
        }
    }

    fn fail_session(&mut self, kind: SpeechErrorKind) {
        if let Some(session) = self.playback.current_id() {
            self.capture.invalidate(session);
        }
        self.set_status(Status::Error(kind));
    }

    fn drop_stale(&self, what: &str, session: SessionId) {
        debug!(
            "Dropping stale {} signal from session {} (current: {:?})",
            what,
            session,
            self.playback.current_id()
        );
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.emit();
    }

    fn emit(&self) {
        let update = StatusUpdate::new(self.playback.current_id(), self.status.clone(), self.controls());
        debug!("Status: {}", update.text);
        // Nobody listening is fine; the status stays queryable via `status()`.
        let _ = self.status_tx.send(update);
    }
}
