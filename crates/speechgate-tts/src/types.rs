use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsError};

/// Speech generation request body
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    /// Text to synthesize into speech
    pub text: String,
    /// Voice style key, e.g. `male_standard` or `rick_style`
    pub voice_type: String,
}

/// Successful generation response
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechResponse {
    pub status: String,
    /// Relative URL the audio can be fetched from
    pub audio_url: String,
    pub filename: String,
}

impl SpeechResponse {
    pub fn success(filename: &str) -> Self {
        Self {
            status: "success".to_string(),
            audio_url: format!("/audio/{filename}"),
            filename: filename.to_string(),
        }
    }
}

/// Entry of the voice listing
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceSummary {
    pub voice_type: String,
    pub provider: String,
    pub label: String,
}

/// Encoding of a generated audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }

    /// Guess the format from a file name, defaulting to MP3
    pub fn from_filename(filename: &str) -> Self {
        match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => Self::Wav,
            _ => Self::Mp3,
        }
    }
}

/// Text plus the engine parameters resolved from a voice style
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    rate: f32,
    volume: f32,
    voice_index: Option<usize>,
}

impl SynthesisRequest {
    /// # Errors
    ///
    /// Returns `InvalidRequest` for blank text or a volume outside `0.0..=1.0`
    pub fn new(text: impl Into<String>, rate: f32, volume: f32, voice_index: Option<usize>) -> Result<Self> {
        let text = text.into();

        if text.trim().is_empty() {
            return Err(TtsError::InvalidRequest("text must not be empty".to_string()));
        }

        if !(0.0..=1.0).contains(&volume) {
            return Err(TtsError::InvalidRequest(format!(
                "volume must be between 0.0 and 1.0, got {volume}"
            )));
        }

        Ok(Self {
            text,
            rate,
            volume,
            voice_index,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn rate(&self) -> f32 {
        self.rate
    }

    pub const fn volume(&self) -> f32 {
        self.volume
    }

    pub const fn voice_index(&self) -> Option<usize> {
        self.voice_index
    }
}

/// A generated audio file known to exist and be non-empty
///
/// Only constructed through [`OutputArtifact::verify`], so holding one means
/// the file was present when synthesis finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    path: PathBuf,
    size: u64,
}

impl OutputArtifact {
    /// Check that `path` exists and has content
    ///
    /// # Errors
    ///
    /// Returns `SynthesisFailure` if the file is missing, unreadable or empty
    pub fn verify(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| TtsError::SynthesisFailure(format!("audio file was not created: {e}")))?;

        if !metadata.is_file() {
            return Err(TtsError::SynthesisFailure("audio output is not a regular file".to_string()));
        }

        if metadata.len() == 0 {
            return Err(TtsError::SynthesisFailure("audio file is empty".to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn size(&self) -> u64 {
        self.size
    }

    pub fn filename(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_rejected() {
        let err = SynthesisRequest::new("  \n", 150.0, 1.0, None).unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)));
    }

    #[test]
    fn volume_bounds_enforced() {
        assert!(SynthesisRequest::new("hello", 150.0, 0.0, None).is_ok());
        assert!(SynthesisRequest::new("hello", 150.0, 1.0, Some(3)).is_ok());
        assert!(SynthesisRequest::new("hello", 150.0, 1.01, None).is_err());
        assert!(SynthesisRequest::new("hello", 150.0, -0.5, None).is_err());
    }

    #[test]
    fn format_from_filename() {
        assert_eq!(AudioFormat::from_filename("a.wav"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_filename("a.WAV"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_filename("a.mp3"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_filename("noext"), AudioFormat::Mp3);
    }

    #[test]
    fn verify_rejects_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.wav");
        assert!(matches!(
            OutputArtifact::verify(&missing),
            Err(TtsError::SynthesisFailure(_))
        ));

        let empty = dir.path().join("empty.wav");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            OutputArtifact::verify(&empty),
            Err(TtsError::SynthesisFailure(_))
        ));
    }

    #[test]
    fn verify_accepts_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.mp3");
        std::fs::write(&path, b"FAKEAUDIO").unwrap();

        let artifact = OutputArtifact::verify(&path).unwrap();
        assert_eq!(artifact.size(), 9);
        assert_eq!(artifact.filename(), Some("speech.mp3"));
    }

    #[test]
    fn response_links_audio() {
        let response = SpeechResponse::success("abc.wav");
        assert_eq!(response.status, "success");
        assert_eq!(response.audio_url, "/audio/abc.wav");
    }
}
