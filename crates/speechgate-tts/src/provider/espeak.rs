//! Offline synthesis with `espeak-ng`
//!
//! Every request drives a fresh engine instance through the
//! [`SynthesisGate`], so only one `espeak-ng` lifecycle is ever active.

use std::io::{ErrorKind, Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{
    error::Result,
    gate::{
        GateSettings, SynthesisGate,
        engine::{EngineError, EngineFactory, EngineVoice, SpeechEngine},
    },
    types::{AudioFormat, OutputArtifact, SynthesisRequest},
    voices::VoiceProfile,
};

use super::TtsProvider;

const DEFAULT_BINARY: &str = "espeak-ng";

/// Slowest and fastest speeds `espeak-ng` accepts, in words per minute
const MIN_SPEED: f32 = 80.0;
const MAX_SPEED: f32 = 450.0;

/// How often a running synthesis is checked for exit
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Starts `espeak-ng` engine instances
pub(crate) struct EspeakFactory {
    binary: PathBuf,
    timeout: Duration,
}

impl EspeakFactory {
    pub fn new(binary: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            timeout,
        }
    }
}

impl EngineFactory for EspeakFactory {
    fn create(&self) -> std::result::Result<Box<dyn SpeechEngine>, EngineError> {
        let status = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| EngineError::Init(format!("cannot run {}: {e}", self.binary.display())))?;

        if !status.success() {
            return Err(EngineError::Init(format!(
                "{} --version exited with {status}",
                self.binary.display()
            )));
        }

        tracing::trace!(binary = %self.binary.display(), "espeak-ng engine started");

        Ok(Box::new(EspeakEngine {
            binary: self.binary.clone(),
            timeout: self.timeout,
            voice: None,
            speed: 175,
            amplitude: 100,
            queued: None,
        }))
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }
}

struct Utterance {
    text: String,
    path: PathBuf,
}

struct EspeakEngine {
    binary: PathBuf,
    timeout: Duration,
    voice: Option<String>,
    speed: u32,
    amplitude: u32,
    queued: Option<Utterance>,
}

impl SpeechEngine for EspeakEngine {
    fn voices(&mut self) -> std::result::Result<Vec<EngineVoice>, EngineError> {
        let output = Command::new(&self.binary)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(EngineError::operation(
                "voices",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    fn set_voice(&mut self, id: &str) -> std::result::Result<(), EngineError> {
        self.voice = Some(id.to_string());
        Ok(())
    }

    fn set_rate(&mut self, words_per_minute: f32) -> std::result::Result<(), EngineError> {
        self.speed = speed(words_per_minute)?;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> std::result::Result<(), EngineError> {
        self.amplitude = amplitude(volume)?;
        Ok(())
    }

    fn save_to_file(&mut self, text: &str, path: &Path) -> std::result::Result<(), EngineError> {
        self.queued = Some(Utterance {
            text: text.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn run_and_wait(&mut self) -> std::result::Result<(), EngineError> {
        let Some(utterance) = self.queued.take() else {
            return Ok(());
        };

        let mut command = Command::new(&self.binary);
        command
            .args(["-b", "1"])
            .arg("-s")
            .arg(self.speed.to_string())
            .arg("-a")
            .arg(self.amplitude.to_string())
            .arg("-w")
            .arg(&utterance.path);

        if let Some(ref voice) = self.voice {
            command.arg("-v").arg(voice);
        }

        let mut child = command
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Closing stdin marks the end of the text
        let writer = child.stdin.take().map(|mut stdin| {
            let text = utterance.text;
            std::thread::spawn(move || stdin.write_all(text.as_bytes()))
        });

        let reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });

        // On timeout the helper threads are left to finish once the pipes close
        let status = wait_with_deadline(&mut child, self.timeout)?;

        let written = match writer {
            Some(handle) => join_helper(handle)?,
            None => Ok(()),
        };
        let stderr = match reader {
            Some(handle) => join_helper(handle)?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(EngineError::operation(
                "run_and_wait",
                format!(
                    "espeak-ng exited with {status}: {}",
                    String::from_utf8_lossy(&stderr).trim()
                ),
            ));
        }

        match written {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn stop(&mut self) -> std::result::Result<(), EngineError> {
        self.queued = None;
        Ok(())
    }

    fn dispose(self: Box<Self>) {
        tracing::trace!(binary = %self.binary.display(), "espeak-ng engine disposed");
    }
}

/// Wait for `child` to exit, killing it once `timeout` has elapsed
///
/// The child is always reaped before this returns.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::result::Result<ExitStatus, EngineError> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(pid = child.id(), ?timeout, "killing espeak-ng after synthesis timeout");
                kill_and_reap(child);
                return Err(EngineError::operation(
                    "run_and_wait",
                    format!("espeak-ng did not finish within {timeout:?}"),
                ));
            }
            Ok(None) => std::thread::sleep(EXIT_POLL),
            Err(e) => {
                kill_and_reap(child);
                return Err(e.into());
            }
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("failed to kill espeak-ng: {e}");
    }

    if let Err(e) = child.wait() {
        tracing::debug!("failed to reap espeak-ng: {e}");
    }
}

fn join_helper<T>(handle: JoinHandle<T>) -> std::result::Result<T, EngineError> {
    handle
        .join()
        .map_err(|_| EngineError::operation("run_and_wait", "espeak-ng pipe thread panicked"))
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
fn parse_voices(listing: &str) -> Vec<EngineVoice> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let priority = columns.next()?;
            if priority == "Pty" {
                return None;
            }

            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            let file = columns.next().unwrap_or(language);

            Some(EngineVoice {
                id: file.to_string(),
                name: name.replace('_', " "),
                language: language.to_string(),
            })
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn speed(words_per_minute: f32) -> std::result::Result<u32, EngineError> {
    if !words_per_minute.is_finite() {
        return Err(EngineError::operation("set_rate", format!("invalid rate {words_per_minute}")));
    }

    Ok(words_per_minute.clamp(MIN_SPEED, MAX_SPEED).round() as u32)
}

/// Volume 1.0 maps to amplitude 100, the engine's default
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn amplitude(volume: f32) -> std::result::Result<u32, EngineError> {
    if !volume.is_finite() {
        return Err(EngineError::operation("set_volume", format!("invalid volume {volume}")));
    }

    Ok((volume.clamp(0.0, 1.0) * 100.0).round() as u32)
}

/// Offline provider backed by `espeak-ng`
pub(crate) struct EspeakProvider {
    gate: SynthesisGate,
    name: String,
}

impl EspeakProvider {
    pub fn new(name: String, binary: Option<PathBuf>, settings: GateSettings) -> Self {
        let factory = std::sync::Arc::new(EspeakFactory::new(binary, settings.synthesis_timeout));

        Self {
            gate: SynthesisGate::new(factory, settings),
            name,
        }
    }
}

#[async_trait]
impl TtsProvider for EspeakProvider {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile, output: &Path) -> Result<OutputArtifact> {
        let settings = &voice.settings;
        let request = SynthesisRequest::new(text, settings.rate, settings.volume, settings.voice_index)?;

        tracing::debug!(
            "espeak-ng request: voice={}, rate={}, volume={}, input_len={}",
            voice.key,
            request.rate(),
            request.volume(),
            text.len(),
        );

        self.gate.synthesize(request, output.to_path_buf()).await
    }

    fn format(&self) -> AudioFormat {
        self.gate.format()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
