//! **EspeakSpeechEngine** - drives a local `espeak-ng` binary as the speech engine.
//!
//! Each utterance runs as a child process that speaks straight to the default
//! output device. Pause/resume stop and continue the process (`SIGSTOP` /
//! `SIGCONT`); cancel kills it. The exit status becomes the end or error signal.
//!
//! Env overrides: `ESPEAK_BIN` (otherwise `espeak-ng`, then `espeak`, on `PATH`).

use crate::engine::{SpeechEngine, SpeechHandle};
use crate::error::{SessionError, SessionResult, SpeechErrorKind};
use crate::messages::{SessionId, SignalSender};
use crate::request::Utterance;
use crate::voice::VoiceInfo;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

struct ActiveUtterance {
    handle: SpeechHandle,
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
}

pub struct EspeakSpeechEngine {
    bin: PathBuf,
    voices: Vec<VoiceInfo>,
    next_handle: u64,
    active: Option<ActiveUtterance>,
}

impl EspeakSpeechEngine {
    /// Locate the binary and load its voice list.
    ///
    /// Fails with [`SessionError::UnsupportedEngine`] when no binary is found.
    pub fn detect() -> SessionResult<Self> {
        let bin = find_binary("ESPEAK_BIN", "espeak-ng")
            .or_else(|| find_on_path("espeak"))
            .ok_or_else(|| SessionError::UnsupportedEngine("espeak-ng not found".to_string()))?;
        Self::with_binary(bin)
    }

    pub fn with_binary(bin: PathBuf) -> SessionResult<Self> {
        info!("🔊 Using espeak binary: {}", bin.display());
        let output = std::process::Command::new(&bin).arg("--voices").output()?;
        if !output.status.success() {
            return Err(SessionError::UnsupportedEngine(format!(
                "{} --voices failed: {}",
                bin.display(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let voices = parse_voice_list(&String::from_utf8_lossy(&output.stdout));
        debug!("espeak reported {} voices", voices.len());
        Ok(Self {
            bin,
            voices,
            next_handle: 0,
            active: None,
        })
    }

    fn signal_active(&self, handle: SpeechHandle, signal: libc::c_int) -> Result<(), SpeechErrorKind> {
        let pid = self
            .active
            .as_ref()
            .filter(|a| a.handle == handle)
            .and_then(|a| a.pid)
            .ok_or(SpeechErrorKind::InvalidArgument)?;
        // SAFETY: `kill` has no memory-safety preconditions; the pid belongs to our own child.
        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(SpeechErrorKind::Other(std::io::Error::last_os_error().to_string()))
        }
    }
}

impl SpeechEngine for EspeakSpeechEngine {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn start(
        &mut self,
        session: SessionId,
        utterance: &Utterance,
        signals: SignalSender,
    ) -> Result<SpeechHandle, SpeechErrorKind> {
        if let Some(previous) = self.active.as_ref().map(|a| a.handle) {
            self.cancel(previous);
        }

        let mut cmd = Command::new(&self.bin);
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(voice.id.as_str());
        }
        let (wpm, pitch, amplitude) = espeak_params(utterance);
        cmd.arg("-s").arg(wpm.to_string());
        cmd.arg("-p").arg(pitch.to_string());
        cmd.arg("-a").arg(amplitude.to_string());
        cmd.arg("--").arg(&utterance.text);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Running espeak for session {}: {:?}", session, cmd);

        let mut child = cmd.spawn().map_err(|e| {
            warn!("espeak spawn failed: {}", e);
            SpeechErrorKind::SynthesisUnavailable
        })?;

        self.next_handle += 1;
        let handle = SpeechHandle(self.next_handle);
        let pid = child.id();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            signals.speech_started(session);
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => signals.speech_ended(session),
                    Ok(status) => {
                        warn!("espeak exited with {} for session {}", status, session);
                        signals.speech_failed(session, SpeechErrorKind::SynthesisFailed);
                    }
                    Err(e) => {
                        warn!("waiting on espeak failed: {}", e);
                        signals.speech_failed(session, SpeechErrorKind::AudioHardware);
                    }
                },
                _ = cancel_rx => {
                    if let Err(e) = child.kill().await {
                        debug!("espeak kill for session {} failed: {}", session, e);
                    }
                    signals.speech_failed(session, SpeechErrorKind::Canceled);
                }
            }
        });

        self.active = Some(ActiveUtterance {
            handle,
            pid,
            cancel: Some(cancel_tx),
        });
        Ok(handle)
    }

    fn pause(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind> {
        self.signal_active(handle, libc::SIGSTOP)
    }

    fn resume(&mut self, handle: SpeechHandle) -> Result<(), SpeechErrorKind> {
        self.signal_active(handle, libc::SIGCONT)
    }

    fn cancel(&mut self, handle: SpeechHandle) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if active.handle != handle {
            self.active = Some(active);
            return;
        }
        // A stopped process still dies on SIGKILL, but continue it so it exits promptly.
        if let Some(pid) = active.pid {
            // SAFETY: see `signal_active`.
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGCONT);
            }
        }
        if let Some(cancel) = active.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Map rate/pitch/volume onto espeak's words-per-minute, pitch (0–99) and amplitude (0–200).
fn espeak_params(utterance: &Utterance) -> (i32, i32, i32) {
    let wpm = (175.0 * utterance.rate).round().clamp(80.0, 450.0) as i32;
    let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as i32;
    let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0) as i32;
    (wpm, pitch, amplitude)
}

/// Parse `espeak-ng --voices` output:
/// `Pty Language Age/Gender VoiceName File Other Languages`
fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _priority = cols.next()?;
            let lang = cols.next()?;
            let _age_gender = cols.next()?;
            let name = cols.next()?;
            Some(VoiceInfo::new(lang, name.replace('_', " "), lang))
        })
        .collect()
}

fn find_binary(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    find_on_path(default_bin)
}

fn find_on_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = Path::new(bin);
        return p.exists().then(|| p.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_voice_table() {
        let output = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                      5  af              --/M      Afrikaans          gmw/af\n \
                      5  en-us           --/M      English_(America)  gmw/en-US            (en 10)\n";
        let voices = parse_voice_list(output);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[1].id.as_str(), "en-us");
        assert_eq!(voices[1].name, "English (America)");
        assert_eq!(voices[1].label(), "English (America) (en-us)");
    }

    #[test]
    fn parameters_map_to_espeak_ranges() {
        let utterance = Utterance {
            text: "hi".into(),
            voice: None,
            rate: 1.0,
            pitch: 2.0,
            volume: 0.5,
        };
        assert_eq!(espeak_params(&utterance), (175, 99, 50));
    }
}
