//! Error types for the speech capture system

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while driving playback and capture
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Speech engine unavailable: {0}")]
    UnsupportedEngine(String),

    #[error("Speech engine error: {0}")]
    SpeechEngine(SpeechErrorKind),

    #[error("Capture engine error: {0}")]
    CaptureEngine(String),

    #[error("No artifact available for download")]
    NoArtifactAvailable,

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        SessionError::Config(err.to_string())
    }
}

#[cfg(feature = "cpal")]
impl From<cpal::DevicesError> for SessionError {
    fn from(err: cpal::DevicesError) -> Self {
        SessionError::CaptureEngine(err.to_string())
    }
}

#[cfg(feature = "cpal")]
impl From<cpal::DefaultStreamConfigError> for SessionError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        SessionError::CaptureEngine(err.to_string())
    }
}

#[cfg(feature = "cpal")]
impl From<cpal::BuildStreamError> for SessionError {
    fn from(err: cpal::BuildStreamError) -> Self {
        SessionError::CaptureEngine(err.to_string())
    }
}

#[cfg(feature = "cpal")]
impl From<cpal::PlayStreamError> for SessionError {
    fn from(err: cpal::PlayStreamError) -> Self {
        SessionError::CaptureEngine(err.to_string())
    }
}

/// Failure kinds reported by a speech engine.
///
/// Rendered as the short code shown in `Error: <kind>` status text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechErrorKind {
    Canceled,
    Interrupted,
    AudioBusy,
    AudioHardware,
    Network,
    SynthesisUnavailable,
    SynthesisFailed,
    LanguageUnavailable,
    VoiceUnavailable,
    TextTooLong,
    InvalidArgument,
    NotAllowed,
    Other(String),
}

impl SpeechErrorKind {
    /// Map an engine-supplied error code onto a kind. Unknown codes are kept verbatim.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "canceled" => Self::Canceled,
            "interrupted" => Self::Interrupted,
            "audio-busy" => Self::AudioBusy,
            "audio-hardware" => Self::AudioHardware,
            "network" => Self::Network,
            "synthesis-unavailable" => Self::SynthesisUnavailable,
            "synthesis-failed" => Self::SynthesisFailed,
            "language-unavailable" => Self::LanguageUnavailable,
            "voice-unavailable" => Self::VoiceUnavailable,
            "text-too-long" => Self::TextTooLong,
            "invalid-argument" => Self::InvalidArgument,
            "not-allowed" => Self::NotAllowed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Canceled => "canceled",
            Self::Interrupted => "interrupted",
            Self::AudioBusy => "audio-busy",
            Self::AudioHardware => "audio-hardware",
            Self::Network => "network",
            Self::SynthesisUnavailable => "synthesis-unavailable",
            Self::SynthesisFailed => "synthesis-failed",
            Self::LanguageUnavailable => "language-unavailable",
            Self::VoiceUnavailable => "voice-unavailable",
            Self::TextTooLong => "text-too-long",
            Self::InvalidArgument => "invalid-argument",
            Self::NotAllowed => "not-allowed",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_back_to_themselves() {
        for code in ["canceled", "audio-busy", "synthesis-failed", "not-allowed"] {
            assert_eq!(SpeechErrorKind::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let kind = SpeechErrorKind::from_code("exploded");
        assert_eq!(kind, SpeechErrorKind::Other("exploded".to_string()));
        assert_eq!(kind.to_string(), "exploded");
    }

    #[test]
    fn speech_engine_error_message_carries_kind() {
        let err = SessionError::SpeechEngine(SpeechErrorKind::Network);
        assert_eq!(err.to_string(), "Speech engine error: network");
    }
}
