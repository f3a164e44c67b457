//! Utterance requests and their validation.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::voice::{VoiceCatalog, VoiceId, VoiceInfo};
use tracing::debug;

/// What the user asked to have spoken. Parameters left unset take the configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub text: String,
    pub voice: Option<VoiceId>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
}

impl UtteranceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            rate: None,
            pitch: None,
            volume: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(VoiceId::new(voice));
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Trim the text, clamp the parameters and resolve the voice against `catalog`.
    ///
    /// Fails with [`SessionError::InvalidInput`] when nothing is left after trimming.
    /// A voice id the catalog does not know resolves to the engine default.
    pub fn validate(&self, config: &SessionConfig, catalog: &VoiceCatalog) -> SessionResult<Utterance> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidInput("text is empty".to_string()));
        }

        let voice = match &self.voice {
            Some(id) => {
                let found = catalog.find(id).cloned();
                if found.is_none() {
                    debug!("Voice {} not in catalog, using engine default", id);
                }
                found
            }
            None => None,
        };

        Ok(Utterance {
            text: text.to_string(),
            voice,
            rate: config.rate.clamp(self.rate.unwrap_or(config.default_rate), config.default_rate),
            pitch: config.pitch.clamp(self.pitch.unwrap_or(config.default_pitch), config.default_pitch),
            volume: config
                .volume
                .clamp(self.volume.unwrap_or(config.default_volume), config.default_volume),
        })
    }
}

/// A validated utterance: trimmed non-empty text, in-range parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<VoiceInfo>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> VoiceCatalog {
        VoiceCatalog::new(vec![VoiceInfo::new("en-us", "English (America)", "en-US")])
    }

    #[test]
    fn text_is_trimmed_and_defaults_applied() {
        let utterance = UtteranceRequest::new("  hello \n")
            .validate(&SessionConfig::default(), &catalog())
            .unwrap();
        assert_eq!(utterance.text, "hello");
        assert_eq!((utterance.rate, utterance.pitch, utterance.volume), (1.0, 1.0, 1.0));
        assert!(utterance.voice.is_none());
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let result = UtteranceRequest::new(" \t ").validate(&SessionConfig::default(), &catalog());
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[test]
    fn parameters_are_clamped() {
        let utterance = UtteranceRequest::new("hi")
            .with_rate(42.0)
            .with_pitch(-1.0)
            .with_volume(f32::NAN)
            .validate(&SessionConfig::default(), &catalog())
            .unwrap();
        assert_eq!(utterance.rate, 10.0);
        assert_eq!(utterance.pitch, 0.0);
        assert_eq!(utterance.volume, 1.0);
    }

    #[test]
    fn voice_resolution() {
        let config = SessionConfig::default();
        let known = UtteranceRequest::new("hi").with_voice("en-us").validate(&config, &catalog()).unwrap();
        assert_eq!(known.voice.map(|v| v.lang), Some("en-US".to_string()));

        let unknown = UtteranceRequest::new("hi").with_voice("xx").validate(&config, &catalog()).unwrap();
        assert!(unknown.voice.is_none());
    }
}
