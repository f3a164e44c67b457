//! Single-slot store for the downloadable audio artifact.

use crate::error::{SessionError, SessionResult};
use crate::messages::SessionId;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Finalized audio for one completed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Session the audio was captured for
    pub session: SessionId,
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(session: SessionId, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            session,
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the bytes to `dir/file_name`, creating `dir` if needed.
    pub fn save_to(&self, dir: &Path, file_name: &str) -> SessionResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, &self.bytes)?;
        info!("💾 Saved {} bytes ({}) to {}", self.len(), self.mime_type, path.display());
        Ok(path)
    }
}

/// Holds at most one artifact. Publishing replaces the old one; clearing drops
/// the store's reference right away rather than when the store itself goes away.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    slot: Option<Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, artifact: Artifact) {
        if let Some(old) = self.slot.replace(artifact) {
            debug!("Released artifact for session {} ({} bytes)", old.session, old.len());
        }
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.slot.take() {
            debug!("Cleared artifact for session {} ({} bytes)", old.session, old.len());
        }
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.slot.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.slot.is_some()
    }

    /// The artifact to hand to a download, or [`SessionError::NoArtifactAvailable`].
    pub fn download(&self) -> SessionResult<&Artifact> {
        self.slot.as_ref().ok_or(SessionError::NoArtifactAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_previous() {
        let mut store = ArtifactStore::new();
        store.publish(Artifact::new(SessionId(1), vec![1, 2], "audio/wav"));
        store.publish(Artifact::new(SessionId(2), vec![3], "audio/wav"));
        let current = store.current().unwrap();
        assert_eq!(current.session, SessionId(2));
        assert_eq!(&current.bytes[..], &[3]);
    }

    #[test]
    fn clear_releases_bytes() {
        let mut store = ArtifactStore::new();
        store.publish(Artifact::new(SessionId(1), vec![0; 64], "audio/wav"));
        let held = Arc::clone(&store.current().unwrap().bytes);
        assert_eq!(Arc::strong_count(&held), 2);
        store.clear();
        assert_eq!(Arc::strong_count(&held), 1);
        assert!(store.current().is_none());
    }

    #[test]
    fn download_without_artifact_fails() {
        let store = ArtifactStore::new();
        assert!(matches!(store.download(), Err(SessionError::NoArtifactAvailable)));
    }

    #[test]
    fn save_writes_bytes() {
        let dir = std::env::temp_dir().join(format!("speech-capture-test-{}", std::process::id()));
        let artifact = Artifact::new(SessionId(7), b"RIFFdata".to_vec(), "audio/wav");
        let path = artifact.save_to(&dir, "speech.wav").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFFdata");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
