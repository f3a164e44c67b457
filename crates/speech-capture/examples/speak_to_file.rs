//! Example: Speak To File
//!
//! Speaks the text given on the command line through espeak-ng while
//! recording the default (or configured) input device, then saves the
//! recording. Point the capture device at a monitor/loopback source to
//! record exactly what is played.
//!
//! ```text
//! cargo run --example speak_to_file --features espeak,cpal -- "Hello there"
//! ```
//!
//! Reads `.env`, `config/speech_capture.toml` and `SPEECH_CAPTURE__*` variables.
//! `CAPTURE_DEVICE` selects the input device by name.

use speech_capture::{
    CaptureDeviceConfig, CpalCaptureEngine, EspeakSpeechEngine, SessionConfig, SessionError,
    SessionRuntime, Status, StatusUpdate, UtteranceRequest,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let config = SessionConfig::load()?;

    let speech = match EspeakSpeechEngine::detect() {
        Ok(engine) => engine,
        Err(e) => {
            let update = StatusUpdate::unsupported();
            error!("{}: {}", update.text, e);
            return Err(e.into());
        }
    };
    for name in CpalCaptureEngine::list_input_devices()? {
        info!("🎙️ Input device: {}", name);
    }
    let capture = CpalCaptureEngine::new(CaptureDeviceConfig {
        device_name: std::env::var("CAPTURE_DEVICE").ok(),
        ..CaptureDeviceConfig::default()
    })?;

    let (runtime, handle, mut statuses) =
        SessionRuntime::new(config, Box::new(speech), Box::new(capture))?;

    let script = async {
        handle.speak(UtteranceRequest::new(text)).await?;

        while let Some(update) = statuses.recv().await {
            info!("Status: {}", update.text);
            match update.status {
                Status::AudioReady => break,
                Status::Error(_) | Status::Stopped | Status::CaptureUnavailable => {
                    warn!("Nothing was recorded");
                    handle.shutdown()?;
                    return Ok(());
                }
                _ => {}
            }
        }

        let path = handle.download().await?;
        info!("💾 Saved {}", path.display());
        handle.shutdown()?;
        Ok::<_, SessionError>(())
    };

    let (_controller, result) = tokio::join!(runtime.run(), script);
    result?;
    Ok(())
}
