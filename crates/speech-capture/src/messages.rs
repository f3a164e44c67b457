//! Message types delivered to the session controller.
//!
//! Engine callbacks and user commands share one FIFO queue of [`Input`]s so
//! they are handled strictly in arrival order. Every engine signal carries the
//! [`SessionId`] it belongs to; the controller drops signals whose id is stale.

use crate::artifact::Artifact;
use crate::error::{SessionError, SessionResult, SpeechErrorKind};
use crate::request::UtteranceRequest;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Monotonic token distinguishing the current utterance from superseded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous notifications raised by the speech and capture engines.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Speech engine began producing audio
    SpeechStarted { session: SessionId },
    /// Speech engine finished the utterance
    SpeechEnded { session: SessionId },
    /// Speech engine failed
    SpeechFailed { session: SessionId, kind: SpeechErrorKind },
    /// Capture engine produced a fragment of recorded audio
    ChunkAvailable { session: SessionId, bytes: Vec<u8> },
    /// Capture engine flushed its last fragment and stopped
    CaptureStopped { session: SessionId },
    /// Capture engine failed; playback continues
    CaptureFailed { session: SessionId, reason: String },
    /// The speech engine's voice list changed
    CatalogChanged,
}

impl Signal {
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Signal::SpeechStarted { session }
            | Signal::SpeechEnded { session }
            | Signal::SpeechFailed { session, .. }
            | Signal::ChunkAvailable { session, .. }
            | Signal::CaptureStopped { session }
            | Signal::CaptureFailed { session, .. } => Some(*session),
            Signal::CatalogChanged => None,
        }
    }
}

/// User-issued requests processed by the session runtime.
#[derive(Debug)]
pub enum Command {
    Speak {
        request: UtteranceRequest,
        reply: oneshot::Sender<SessionResult<SessionId>>,
    },
    Pause,
    Resume,
    Stop,
    /// Save the current artifact to the configured location
    Download {
        reply: oneshot::Sender<SessionResult<PathBuf>>,
    },
    /// Hand back a copy of the current artifact without saving it
    Fetch {
        reply: oneshot::Sender<SessionResult<Artifact>>,
    },
    Shutdown,
}

/// One entry in the controller's FIFO queue.
#[derive(Debug)]
pub enum Input {
    Command(Command),
    Signal(Signal),
}

/// Cloneable, `Send` handle engines use to report signals.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Input>,
}

impl SignalSender {
    pub fn new(tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { tx }
    }

    /// Create a sender together with the receiving end of the input queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Input>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, signal: Signal) -> SessionResult<()> {
        self.tx
            .send(Input::Signal(signal))
            .map_err(|e| SessionError::ChannelSend(e.to_string()))
    }

    /// Best-effort send used from engine callbacks; a closed queue means the runtime is gone.
    fn notify(&self, signal: Signal) {
        if let Err(e) = self.send(signal) {
            debug!("Signal dropped: {}", e);
        }
    }

    pub fn speech_started(&self, session: SessionId) {
        self.notify(Signal::SpeechStarted { session });
    }

    pub fn speech_ended(&self, session: SessionId) {
        self.notify(Signal::SpeechEnded { session });
    }

    pub fn speech_failed(&self, session: SessionId, kind: SpeechErrorKind) {
        self.notify(Signal::SpeechFailed { session, kind });
    }

    pub fn chunk(&self, session: SessionId, bytes: Vec<u8>) {
        self.notify(Signal::ChunkAvailable { session, bytes });
    }

    pub fn capture_stopped(&self, session: SessionId) {
        self.notify(Signal::CaptureStopped { session });
    }

    pub fn capture_failed(&self, session: SessionId, reason: impl Into<String>) {
        self.notify(Signal::CaptureFailed {
            session,
            reason: reason.into(),
        });
    }

    pub fn catalog_changed(&self) {
        self.notify(Signal::CatalogChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_monotonic() {
        let first = SessionId::default().next();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.to_string(), "#2");
    }

    #[test]
    fn signals_arrive_in_send_order() {
        let (signals, mut rx) = SignalSender::channel();
        let session = SessionId(3);
        signals.chunk(session, vec![1]);
        signals.capture_stopped(session);
        signals.speech_ended(session);

        let mut seen = Vec::new();
        while let Ok(Input::Signal(signal)) = rx.try_recv() {
            seen.push(signal);
        }
        assert_eq!(
            seen,
            vec![
                Signal::ChunkAvailable { session, bytes: vec![1] },
                Signal::CaptureStopped { session },
                Signal::SpeechEnded { session },
            ]
        );
    }

    #[test]
    fn catalog_change_has_no_session() {
        assert_eq!(Signal::CatalogChanged.session(), None);
        assert_eq!(Signal::SpeechEnded { session: SessionId(1) }.session(), Some(SessionId(1)));
    }
}
