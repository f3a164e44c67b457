//! Session runtime - the async driver around [`SessionController`]
//!
//! A single task drains one FIFO queue holding both user commands and engine
//! signals, so nothing is ever reordered and no command blocks on an engine.
//! Engines need not be `Send` (cpal streams are not on every platform), so
//! drive [`SessionRuntime::run`] on the current task, a `LocalSet`, or via
//! `tokio::join!` rather than `tokio::spawn`.

use crate::artifact::Artifact;
use crate::config::SessionConfig;
use crate::controller::SessionController;
use crate::engine::{CaptureEngine, SpeechEngine};
use crate::error::{SessionError, SessionResult};
use crate::messages::{Command, Input, SessionId, SignalSender};
use crate::request::UtteranceRequest;
use crate::status::StatusUpdate;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Owns the controller and its input queue
pub struct SessionRuntime {
    controller: SessionController,
    inputs: mpsc::UnboundedReceiver<Input>,
}

/// Cloneable command side of a running [`SessionRuntime`]
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Input>,
}

impl SessionRuntime {
    /// Create the runtime, its command handle, and the status update stream.
    pub fn new(
        config: SessionConfig,
        speech: Box<dyn SpeechEngine>,
        capture: Box<dyn CaptureEngine>,
    ) -> SessionResult<(Self, SessionHandle, mpsc::UnboundedReceiver<StatusUpdate>)> {
        let (tx, inputs) = mpsc::unbounded_channel();
        let signals = SignalSender::new(tx.clone());
        let (controller, status_rx) = SessionController::new(config, speech, capture, signals)?;

        Ok((Self { controller, inputs }, SessionHandle { tx }, status_rx))
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Process inputs until a shutdown command arrives. Returns the controller
    /// so callers can inspect the final state.
    pub async fn run(mut self) -> SessionController {
        info!("🚀 Session runtime started");
        while let Some(input) = self.inputs.recv().await {
            match input {
                Input::Signal(signal) => self.controller.handle_signal(signal),
                Input::Command(Command::Shutdown) => break,
                Input::Command(command) => self.handle_command(command),
            }
        }
        if let Some(session) = self.controller.current_session() {
            debug!("Stopping session {} on shutdown", session);
        }
        self.controller.stop();
        info!("🛑 Session runtime stopped");
        self.controller
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Speak { request, reply } => {
                let result = self.controller.speak(request);
                let _ = reply.send(result);
            }
            Command::Pause => {
                self.controller.pause();
            }
            Command::Resume => {
                self.controller.resume();
            }
            Command::Stop => {
                self.controller.stop();
            }
            Command::Download { reply } => {
                let result = self.save_artifact();
                let _ = reply.send(result);
            }
            Command::Fetch { reply } => {
                let _ = reply.send(self.controller.download());
            }
            Command::Shutdown => {}
        }
    }

    fn save_artifact(&mut self) -> SessionResult<PathBuf> {
        let artifact = self.controller.download()?;
        let config = self.controller.config();
        let path = match artifact.save_to(&config.download_dir, &config.download_file_name) {
            Ok(path) => path,
            Err(e) => {
                warn!("Saving artifact failed: {}", e);
                return Err(e);
            }
        };
        self.controller.report_downloaded(&path);
        Ok(path)
    }
}

impl SessionHandle {
    fn send(&self, command: Command) -> SessionResult<()> {
        self.tx
            .send(Input::Command(command))
            .map_err(|e| SessionError::ChannelSend(e.to_string()))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<SessionResult<T>>) -> Command,
    ) -> SessionResult<T> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply))?;
        rx.await
            .map_err(|e| SessionError::ChannelReceive(e.to_string()))?
    }

    /// Speak `request`, returning the new session id or the rejection.
    pub async fn speak(&self, request: UtteranceRequest) -> SessionResult<SessionId> {
        self.request(|reply| Command::Speak { request, reply }).await
    }

    pub fn pause(&self) -> SessionResult<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> SessionResult<()> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> SessionResult<()> {
        self.send(Command::Stop)
    }

    /// Save the current artifact to the configured location.
    pub async fn download(&self) -> SessionResult<PathBuf> {
        self.request(|reply| Command::Download { reply }).await
    }

    /// Copy of the current artifact, without saving it.
    pub async fn fetch(&self) -> SessionResult<Artifact> {
        self.request(|reply| Command::Fetch { reply }).await
    }

    pub fn shutdown(&self) -> SessionResult<()> {
        self.send(Command::Shutdown)
    }

    /// Sender engines can use for signals, sharing the command queue.
    pub fn signals(&self) -> SignalSender {
        SignalSender::new(self.tx.clone())
    }
}
