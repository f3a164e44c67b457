//! Voice catalog supplied by the speech engine.

use serde::Serialize;
use std::fmt;

/// Opaque engine-specific voice identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VoiceId(pub String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One selectable voice: a name + locale pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceInfo {
    pub id: VoiceId,
    pub name: String,
    /// BCP 47 style locale (e.g. `en-US`)
    pub lang: String,
    /// Whether the engine uses this voice when none is selected
    pub default: bool,
}

impl VoiceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            id: VoiceId::new(id),
            name: name.into(),
            lang: lang.into(),
            default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Label shown in a voice picker, e.g. `Samantha (en-US)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.lang)
    }
}

/// Snapshot of the engine's voices. Engines may populate it late, so it is
/// re-queried whenever the engine signals that the catalog changed.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<VoiceInfo>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<VoiceInfo>) -> Self {
        Self { voices }
    }

    pub fn voices(&self) -> &[VoiceInfo] {
        &self.voices
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn find(&self, id: &VoiceId) -> Option<&VoiceInfo> {
        self.voices.iter().find(|v| &v.id == id)
    }

    pub fn default_voice(&self) -> Option<&VoiceInfo> {
        self.voices.iter().find(|v| v.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_matches_picker_format() {
        let voice = VoiceInfo::new("v1", "Samantha", "en-US");
        assert_eq!(voice.label(), "Samantha (en-US)");
    }

    #[test]
    fn catalog_lookup() {
        let catalog = VoiceCatalog::new(vec![
            VoiceInfo::new("a", "Alice", "en-GB"),
            VoiceInfo::new("b", "Bruno", "pt-BR").as_default(),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find(&VoiceId::new("a")).map(|v| v.name.as_str()), Some("Alice"));
        assert!(catalog.find(&VoiceId::new("zz")).is_none());
        assert_eq!(catalog.default_voice().map(|v| v.lang.as_str()), Some("pt-BR"));
    }
}
