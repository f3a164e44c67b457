//! # Speech Capture - Speak text and keep what was said
//!
//! This crate coordinates a text-to-speech engine with an audio capture
//! engine so one utterance is spoken and, when it finishes cleanly, its
//! recording becomes a single downloadable artifact.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Session Controller                        │
//! │  ┌──────────────┐   session id   ┌──────────────────────┐   │
//! │  │   Playback   │───────────────→│ Capture Coordinator  │   │
//! │  │ State Machine│  end → finalize│ (chunks + drain join)│   │
//! │  └──────┬───────┘                └──────────┬───────────┘   │
//! │         ↓                                    ↓               │
//! │  ┌──────────────┐                ┌──────────────────────┐   │
//! │  │ Speech Engine│                │    Artifact Store    │   │
//! │  │ (espeak, …)  │                │     (single slot)    │   │
//! │  └──────────────┘                └──────────────────────┘   │
//! │         ↑   signals (FIFO, tagged with session id)   ↑       │
//! └─────────┴──────────────────────────────────────────────┴───┘
//! ```
//!
//! Engine callbacks never touch state directly: they send [`Signal`]s that
//! the controller applies in arrival order, dropping any whose session id
//! has been superseded, stopped or failed.

pub mod artifact;
pub mod capture;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod messages;
pub mod placeholder;
pub mod playback;
pub mod request;
pub mod runtime;
pub mod status;
pub mod voice;

#[cfg(feature = "cpal")]
pub mod cpal_capture;

#[cfg(all(unix, feature = "espeak"))]
pub mod espeak;

pub use artifact::{Artifact, ArtifactStore};
pub use capture::{CaptureCoordinator, CaptureState};
pub use config::{ParamRange, SessionConfig};
pub use controller::SessionController;
pub use engine::{CaptureEngine, SpeechEngine, SpeechHandle};
pub use error::{SessionError, SessionResult, SpeechErrorKind};
pub use messages::{Command, Input, SessionId, Signal, SignalSender};
pub use placeholder::{
    CaptureCall, CaptureProbe, PlaceholderCaptureEngine, PlaceholderSpeechEngine, SpeechCall,
    SpeechProbe,
};
pub use playback::{EndReason, PlaybackMachine, PlaybackState};
pub use request::{Utterance, UtteranceRequest};
pub use runtime::{SessionHandle, SessionRuntime};
pub use status::{ControlState, Status, StatusUpdate};
pub use voice::{VoiceCatalog, VoiceId, VoiceInfo};

#[cfg(feature = "cpal")]
pub use cpal_capture::{CaptureDeviceConfig, CpalCaptureEngine};
#[cfg(all(unix, feature = "espeak"))]
pub use espeak::EspeakSpeechEngine;
