//! Example: Scripted Session
//!
//! Runs one utterance through the session runtime with the placeholder
//! engines, playing the part of the speech and capture engines by hand.
//! No audio hardware is needed.

use speech_capture::{
    PlaceholderCaptureEngine, PlaceholderSpeechEngine, SessionConfig, SessionRuntime, Status,
    UtteranceRequest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🎭 Scripted speech capture session");

    let (speech_engine, speech) = PlaceholderSpeechEngine::new();
    let (capture_engine, capture) = PlaceholderCaptureEngine::new();
    let (runtime, handle, mut statuses) = SessionRuntime::new(
        SessionConfig::default(),
        Box::new(speech_engine),
        Box::new(capture_engine),
    )?;

    let script = async {
        let session = handle.speak(UtteranceRequest::new("Hello from the script")).await?;
        info!("Speaking session {}", session);

        speech.signal_start();
        capture.emit_chunk(b"first chunk ");
        capture.hold_chunk(b"last chunk");
        speech.signal_end();

        while let Some(update) = statuses.recv().await {
            info!("Status: {} {:?}", update.text, update.controls);
            if update.status == Status::AudioReady {
                break;
            }
        }

        let artifact = handle.fetch().await?;
        info!(
            "📦 Artifact for session {}: {} bytes of {}",
            artifact.session,
            artifact.len(),
            artifact.mime_type
        );
        handle.shutdown()?;
        Ok::<_, speech_capture::SessionError>(())
    };

    let (_controller, result) = tokio::join!(runtime.run(), script);
    result?;
    Ok(())
}
