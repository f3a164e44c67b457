//! Playback state machine
//!
//! Tracks the single live utterance and drives the speech engine:
//! `Idle → Speaking ⇄ Paused → Ended`, with `Errored` reachable from any
//! active state. Engine signals are honored only for the current session
//! while it is still active, so a stop or a new speak always beats a late
//! end/error signal.

use crate::engine::{SpeechEngine, SpeechHandle};
use crate::error::SpeechErrorKind;
use crate::messages::{SessionId, SignalSender};
use crate::request::Utterance;
use crate::voice::VoiceInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// How a session reached `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The engine reported the end of the utterance
    Finished,
    /// Stopped by the user
    Stopped,
    /// Replaced by a newer speak request
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Speaking,
    Paused,
    Ended(EndReason),
    Errored(SpeechErrorKind),
}

impl PlaybackState {
    /// Speaking or paused: the engine still owns the utterance.
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Speaking | PlaybackState::Paused)
    }
}

/// The one utterance the controller is tracking
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub id: SessionId,
    pub utterance: Utterance,
    pub state: PlaybackState,
    pub created_at: DateTime<Utc>,
    handle: Option<SpeechHandle>,
}

/// Drives the speech engine for one session at a time.
pub struct PlaybackMachine {
    engine: Box<dyn SpeechEngine>,
    last_id: SessionId,
    current: Option<PlaybackSession>,
}

impl PlaybackMachine {
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            last_id: SessionId::default(),
            current: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    pub fn voices(&self) -> Vec<VoiceInfo> {
        self.engine.voices()
    }

    pub fn watch_catalog(&mut self, signals: SignalSender) {
        self.engine.watch_catalog(signals);
    }

    pub fn state(&self) -> PlaybackState {
        self.current
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current.as_ref().map(|s| s.id)
    }

    /// Whether a signal tagged `id` may still change state.
    pub fn is_live(&self, id: SessionId) -> bool {
        self.current
            .as_ref()
            .map(|s| s.id == id && s.state.is_active())
            .unwrap_or(false)
    }

    /// Cancel an active session so a new one can take its place. Returns the
    /// superseded id, if there was one.
    pub fn supersede(&mut self) -> Option<SessionId> {
        self.cancel_active(EndReason::Superseded)
    }

    /// Allocate the next session id and start speaking.
    ///
    /// On engine failure the new session is left `Errored`; its id stays
    /// current so late signals from it are still recognized.
    pub fn begin(
        &mut self,
        utterance: Utterance,
        signals: SignalSender,
    ) -> Result<SessionId, SpeechErrorKind> {
        let id = self.last_id.next();
        self.last_id = id;

        let result = self.engine.start(id, &utterance, signals);
        let (state, handle) = match &result {
            Ok(handle) => (PlaybackState::Speaking, Some(*handle)),
            Err(kind) => (PlaybackState::Errored(kind.clone()), None),
        };

        match &result {
            Ok(_) => info!(
                "🗣️ Session {} speaking ({} chars, rate {:.2}, pitch {:.2}, volume {:.2})",
                id,
                utterance.text.chars().count(),
                utterance.rate,
                utterance.pitch,
                utterance.volume
            ),
            Err(kind) => warn!("Session {} failed to start: {}", id, kind),
        }

        self.current = Some(PlaybackSession {
            id,
            utterance,
            state,
            created_at: Utc::now(),
            handle,
        });

        result.map(|_| id)
    }

    /// Pause from `Speaking`. `Ok(false)` when called from any other state.
    pub fn pause(&mut self) -> Result<bool, SpeechErrorKind> {
        self.toggle(PlaybackState::Speaking, PlaybackState::Paused)
    }

    /// Resume from `Paused`. `Ok(false)` when called from any other state.
    pub fn resume(&mut self) -> Result<bool, SpeechErrorKind> {
        self.toggle(PlaybackState::Paused, PlaybackState::Speaking)
    }

    fn toggle(&mut self, from: PlaybackState, to: PlaybackState) -> Result<bool, SpeechErrorKind> {
        let current_state = self.state();
        let session = match self.current.as_mut() {
            Some(s) if s.state == from => s,
            _ => {
                debug!("Ignoring transition to {:?} from {:?}", to, current_state);
                return Ok(false);
            }
        };
        let Some(handle) = session.handle else {
            return Ok(false);
        };

        let result = if to == PlaybackState::Paused {
            self.engine.pause(handle)
        } else {
            self.engine.resume(handle)
        };

        match result {
            Ok(()) => {
                info!("Session {}: {:?} → {:?}", session.id, from, to);
                session.state = to;
                Ok(true)
            }
            Err(kind) => {
                warn!("Session {}: engine rejected {:?}: {}", session.id, to, kind);
                self.engine.cancel(handle);
                session.state = PlaybackState::Errored(kind.clone());
                Err(kind)
            }
        }
    }

    /// Stop an active session. Returns its id when something was stopped.
    pub fn stop(&mut self) -> Option<SessionId> {
        self.cancel_active(EndReason::Stopped)
    }

    fn cancel_active(&mut self, reason: EndReason) -> Option<SessionId> {
        let session = self.current.as_mut().filter(|s| s.state.is_active())?;
        if let Some(handle) = session.handle {
            self.engine.cancel(handle);
        }
        info!("⏹️ Session {} ended ({:?})", session.id, reason);
        session.state = PlaybackState::Ended(reason);
        Some(session.id)
    }

    /// Engine confirmed audible output for `id`.
    pub fn on_started(&self, id: SessionId) -> bool {
        self.is_live(id)
    }

    /// Engine finished `id`. Returns true when this ended the current session.
    pub fn on_ended(&mut self, id: SessionId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        if let Some(session) = self.current.as_mut() {
            info!("✅ Session {} finished speaking", id);
            session.state = PlaybackState::Ended(EndReason::Finished);
        }
        true
    }

    /// Engine failed `id`. Returns true when this errored the current session.
    pub fn on_error(&mut self, id: SessionId, kind: SpeechErrorKind) -> bool {
        if !self.is_live(id) {
            return false;
        }
        if let Some(session) = self.current.as_mut() {
            warn!("Session {} errored: {}", id, kind);
            session.state = PlaybackState::Errored(kind);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::placeholder::{PlaceholderSpeechEngine, SpeechCall};
    use crate::request::UtteranceRequest;
    use crate::voice::VoiceCatalog;

    fn utterance(text: &str) -> Utterance {
        UtteranceRequest::new(text)
            .validate(&SessionConfig::default(), &VoiceCatalog::default())
            .unwrap()
    }

    fn machine() -> (PlaybackMachine, crate::placeholder::SpeechProbe, SignalSender) {
        let (engine, probe) = PlaceholderSpeechEngine::new();
        let (signals, _rx) = SignalSender::channel();
        (PlaybackMachine::new(Box::new(engine)), probe, signals)
    }

    #[test]
    fn starts_idle() {
        let (machine, _, _) = machine();
        assert_eq!(machine.state(), PlaybackState::Idle);
        assert!(machine.current_id().is_none());
    }

    #[test]
    fn pause_and_resume_do_not_restart() {
        let (mut machine, probe, signals) = machine();
        let id = machine.begin(utterance("hello"), signals).unwrap();

        assert_eq!(machine.pause(), Ok(true));
        assert_eq!(machine.state(), PlaybackState::Paused);
        assert_eq!(machine.pause(), Ok(false));

        assert_eq!(machine.resume(), Ok(true));
        assert_eq!(machine.state(), PlaybackState::Speaking);
        assert_eq!(probe.start_count(), 1);
        assert_eq!(machine.current_id(), Some(id));
    }

    #[test]
    fn resume_outside_paused_is_noop() {
        let (mut machine, probe, signals) = machine();
        assert_eq!(machine.resume(), Ok(false));
        machine.begin(utterance("hello"), signals).unwrap();
        assert_eq!(machine.resume(), Ok(false));
        assert!(!probe.calls().iter().any(|c| matches!(c, SpeechCall::Resume(_))));
    }

    #[test]
    fn end_signal_after_stop_is_ignored() {
        let (mut machine, _, signals) = machine();
        let id = machine.begin(utterance("hello"), signals).unwrap();
        assert_eq!(machine.stop(), Some(id));
        assert!(!machine.on_ended(id));
        assert!(!machine.on_error(id, SpeechErrorKind::Canceled));
        assert_eq!(machine.state(), PlaybackState::Ended(EndReason::Stopped));
    }

    #[test]
    fn stale_session_signals_are_ignored() {
        let (mut machine, _, signals) = machine();
        let first = machine.begin(utterance("one"), signals.clone()).unwrap();
        assert_eq!(machine.supersede(), Some(first));
        let second = machine.begin(utterance("two"), signals).unwrap();
        assert!(second > first);
        assert!(!machine.on_ended(first));
        assert_eq!(machine.state(), PlaybackState::Speaking);
        assert!(machine.on_ended(second));
        assert_eq!(machine.state(), PlaybackState::Ended(EndReason::Finished));
    }

    #[test]
    fn failed_start_leaves_session_errored() {
        let (mut machine, probe, signals) = machine();
        probe.fail_next_start(SpeechErrorKind::VoiceUnavailable);
        let result = machine.begin(utterance("hello"), signals);
        assert_eq!(result, Err(SpeechErrorKind::VoiceUnavailable));
        assert_eq!(
            machine.state(),
            PlaybackState::Errored(SpeechErrorKind::VoiceUnavailable)
        );
        assert_eq!(machine.stop(), None);
    }
}
