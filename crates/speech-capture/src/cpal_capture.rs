//! Capture engine recording the spoken output via CPAL
//!
//! Records from an input device (pick a loopback/monitor source to capture
//! what the speakers play). The first chunk of every recording is a
//! streaming WAV header; the rest are 16-bit little-endian PCM frames, so
//! the concatenated chunks form a playable `audio/wav` file.

use crate::engine::CaptureEngine;
use crate::error::{SessionError, SessionResult};
use crate::messages::{SessionId, SignalSender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Capture device configuration
#[derive(Debug, Clone)]
pub struct CaptureDeviceConfig {
    /// Input device name; `None` uses the host default
    pub device_name: Option<String>,
    /// Sample rate in Hz (default: 48000)
    pub sample_rate: u32,
    /// Number of channels (default: 2)
    pub channels: u16,
    /// Samples per emitted chunk, across channels (default: 9600 = 100ms stereo at 48kHz)
    pub chunk_samples: usize,
}

impl Default for CaptureDeviceConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: 48000,
            channels: 2,
            chunk_samples: 9600,
        }
    }
}

struct ActiveRecording {
    session: SessionId,
    stream: Stream,
    /// PCM bytes not yet emitted as a chunk
    pending: Arc<Mutex<Vec<u8>>>,
    signals: SignalSender,
}

pub struct CpalCaptureEngine {
    config: CaptureDeviceConfig,
    device: Device,
    stream_config: StreamConfig,
    active: Option<ActiveRecording>,
}

impl CpalCaptureEngine {
    pub fn new(config: CaptureDeviceConfig) -> SessionResult<Self> {
        let host = cpal::default_host();
        let device = match &config.device_name {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| SessionError::CaptureEngine(format!("input device '{}' not found", name)))?,
            None => host
                .default_input_device()
                .ok_or_else(|| SessionError::CaptureEngine("No input device available".to_string()))?,
        };

        info!("📱 Using capture device: {}", device.name().unwrap_or_else(|_| "Unknown".to_string()));
        let default_config = device.default_input_config()?;
        info!("🔧 Default config: {:?}", default_config);

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            config,
            device,
            stream_config,
            active: None,
        })
    }

    /// List available input devices
    pub fn list_input_devices() -> SessionResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn build_stream(
        &self,
        session: SessionId,
        pending: Arc<Mutex<Vec<u8>>>,
        signals: SignalSender,
    ) -> SessionResult<Stream> {
        let chunk_bytes = self.config.chunk_samples.max(1) * 2;
        let err_signals = signals.clone();

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut buffer = match pending.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };
                for &sample in data {
                    let pcm = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
                    buffer.extend_from_slice(&pcm.to_le_bytes());
                    if buffer.len() >= chunk_bytes {
                        signals.chunk(session, std::mem::take(&mut *buffer));
                    }
                }
            },
            move |err| {
                warn!("Capture stream error: {}", err);
                err_signals.capture_failed(session, err.to_string());
            },
            None,
        )?;
        Ok(stream)
    }

    fn take_recording(&mut self, session: SessionId) -> Option<ActiveRecording> {
        match self.active.take() {
            Some(active) if active.session == session => Some(active),
            other => {
                self.active = other;
                None
            }
        }
    }
}

impl CaptureEngine for CpalCaptureEngine {
    fn mime_type(&self) -> String {
        "audio/wav".to_string()
    }

    fn start(&mut self, session: SessionId, signals: SignalSender) -> SessionResult<()> {
        if let Some(previous) = self.active.take() {
            info!("Dropping capture stream for session {}", previous.session);
        }
        let pending = Arc::new(Mutex::new(Vec::with_capacity(self.config.chunk_samples * 2)));
        signals.chunk(
            session,
            wav_stream_header(self.config.sample_rate, self.config.channels),
        );
        let stream = self.build_stream(session, Arc::clone(&pending), signals.clone())?;
        stream.play()?;
        info!("▶️ Capture stream started for session {}", session);
        self.active = Some(ActiveRecording {
            session,
            stream,
            pending,
            signals,
        });
        Ok(())
    }

    fn stop(&mut self, session: SessionId) {
        let Some(recording) = self.take_recording(session) else {
            return;
        };
        // No callbacks run once the stream is gone, so the remainder is final.
        drop(recording.stream);
        let rest = match recording.pending.lock() {
            Ok(mut b) => std::mem::take(&mut *b),
            Err(_) => Vec::new(),
        };
        if !rest.is_empty() {
            recording.signals.chunk(session, rest);
        }
        info!("⏹️ Capture stream stopped for session {}", session);
        recording.signals.capture_stopped(session);
    }

    fn abort(&mut self, session: SessionId) {
        if let Some(recording) = self.take_recording(session) {
            drop(recording.stream);
            info!("Capture stream aborted for session {}", session);
        }
    }
}

/// RIFF/WAVE header for 16-bit PCM with unknown length (sizes set to the maximum).
fn wav_stream_header(sample_rate: u32, channels: u16) -> Vec<u8> {
    let block_align = channels * 2;
    let mut buf = Vec::with_capacity(44);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&u32::MAX.to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&(u32::MAX - 36).to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = wav_stream_header(48000, 2);
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([header[24], header[25], header[26], header[27]]), 48000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 4);
    }
}
