//! Contracts for the two external engines the controller orchestrates.
//!
//! Engine operations return as soon as the request is issued; outcomes
//! (started, ended, chunk, stopped, error) arrive later as [`Signal`]s through
//! the [`SignalSender`] handed over on `start`.
//!
//! [`Signal`]: crate::messages::Signal

use crate::error::{SessionResult, SpeechErrorKind};
use crate::messages::{SessionId, SignalSender};
use crate::request::Utterance;
use crate::voice::VoiceInfo;

/// Engine-issued handle for one utterance in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechHandle(pub u64);

/// Text-to-speech engine. Implement for a platform synthesizer, a local binary, etc.
pub trait SpeechEngine {
    /// Whether the engine can speak at all. Checked once at startup.
    fn is_available(&self) -> bool {
        true
    }

    /// Current voice list. May be empty until the engine has loaded it.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Register for `CatalogChanged` notifications. Engines with a fixed voice list can ignore it.
    fn watch_catalog(&mut self, _signals: SignalSender) {}

    /// Begin speaking. Lifecycle signals must be tagged with `session`.
    fn start(
        &mut self,
        session: SessionId,
        utterance: &Utterance,
        signals: SignalSender,
    ) -> Result<SpeechHandle, SpeechErrorKind>;

    fn pause(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind>;

    fn resume(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind>;

    /// Abandon the utterance. Any later signals for it are stale.
    fn cancel(&mut self, handle: SpeechHandle);
}

/// Records the audible output into a sequence of byte chunks.
pub trait CaptureEngine {
    /// MIME type of the concatenated chunks (e.g. `audio/wav`).
    fn mime_type(&self) -> String;

    /// Start recording for `session`, emitting `ChunkAvailable` signals.
    fn start(&mut self, session: SessionId, signals: SignalSender) -> SessionResult<()>;

    /// Graceful stop: flush pending data as chunks, then emit `CaptureStopped`.
    fn stop(&mut self, session: SessionId);

    /// Tear the recorder down without flushing. Idempotent; no signal is owed.
    fn abort(&mut self, session: SessionId);
}
