//! User-visible status text and control enablement.

use crate::error::SpeechErrorKind;
use crate::messages::SessionId;
use crate::playback::PlaybackState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Status shown to the user after each transition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum Status {
    Ready,
    Speaking,
    Paused,
    Stopped,
    Finished,
    Error(SpeechErrorKind),
    AudioReady,
    NoAudioAvailable,
    /// Speak was requested with empty text
    EmptyText,
    Downloaded,
    /// Recording failed; playback is unaffected
    CaptureUnavailable,
    /// The speech engine cannot be used on this system
    Unsupported,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => f.write_str("Ready"),
            Status::Speaking => f.write_str("Speaking…"),
            Status::Paused => f.write_str("Paused"),
            Status::Stopped => f.write_str("Stopped"),
            Status::Finished => f.write_str("Finished"),
            Status::Error(kind) => write!(f, "Error: {}", kind),
            Status::AudioReady => f.write_str("Audio ready"),
            Status::NoAudioAvailable => f.write_str("No audio available"),
            Status::EmptyText => f.write_str("Please enter some text to speak."),
            Status::Downloaded => f.write_str("Audio downloaded"),
            Status::CaptureUnavailable => f.write_str("Audio capture unavailable"),
            Status::Unsupported => f.write_str("Speech synthesis unsupported"),
        }
    }
}

/// Which controls the view should enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub speak: bool,
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
    pub download: bool,
}

impl ControlState {
    pub fn derive(state: &PlaybackState, artifact_ready: bool) -> Self {
        let speaking = matches!(state, PlaybackState::Speaking);
        let paused = matches!(state, PlaybackState::Paused);
        Self {
            speak: !(speaking || paused),
            pause: speaking,
            resume: paused,
            stop: speaking || paused,
            download: artifact_ready,
        }
    }

    /// Everything off; used when the speech engine is unsupported.
    pub fn disabled() -> Self {
        Self {
            speak: false,
            pause: false,
            resume: false,
            stop: false,
            download: false,
        }
    }
}

/// Emitted on the status channel after every status change
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub session: Option<SessionId>,
    pub status: Status,
    /// Rendered status text
    pub text: String,
    pub controls: ControlState,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(session: Option<SessionId>, status: Status, controls: ControlState) -> Self {
        Self {
            session,
            text: status.to_string(),
            status,
            controls,
            at: Utc::now(),
        }
    }

    /// The update a view shows when no controller could be built because
    /// the speech engine is unavailable.
    pub fn unsupported() -> Self {
        Self::new(None, Status::Unsupported, ControlState::disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::EndReason;

    #[test]
    fn status_text() {
        assert_eq!(Status::Speaking.to_string(), "Speaking…");
        assert_eq!(Status::Error(SpeechErrorKind::AudioBusy).to_string(), "Error: audio-busy");
        assert_eq!(Status::NoAudioAvailable.to_string(), "No audio available");
    }

    #[test]
    fn controls_follow_playback_state() {
        let speaking = ControlState::derive(&PlaybackState::Speaking, false);
        assert!(!speaking.speak && speaking.pause && !speaking.resume && speaking.stop);

        let paused = ControlState::derive(&PlaybackState::Paused, false);
        assert!(paused.resume && !paused.pause && paused.stop);

        let done = ControlState::derive(&PlaybackState::Ended(EndReason::Finished), true);
        assert!(done.speak && done.download && !done.stop);
    }

    #[test]
    fn unsupported_disables_everything() {
        let update = StatusUpdate::unsupported();
        assert_eq!(update.text, "Speech synthesis unsupported");
        assert_eq!(update.controls, ControlState::disabled());
        assert!(update.session.is_none());
    }

    #[test]
    fn status_serializes_with_kind() {
        let json = serde_json::to_value(Status::Error(SpeechErrorKind::Network)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "error", "kind": "network" }));
        let json = serde_json::to_value(Status::Ready).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "ready" }));
    }
}
