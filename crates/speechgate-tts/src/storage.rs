use std::path::{Component, Path, PathBuf};

use crate::{
    error::{Result, TtsError},
    types::AudioFormat,
};

/// Directory generated audio lives in
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

/// A freshly allocated, not yet written, output location
#[derive(Debug)]
pub struct ArtifactSlot {
    pub filename: String,
    pub path: PathBuf,
}

impl AudioStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        std::fs::create_dir_all(&dir).map_err(|e| {
            TtsError::ConfigError(format!("cannot create audio directory {}: {e}", dir.display()))
        })?;

        tracing::debug!(dir = %dir.display(), "audio store ready");

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a unique file name for audio in `format`
    pub fn allocate(&self, format: AudioFormat) -> ArtifactSlot {
        let filename = format!("{}.{}", uuid::Uuid::new_v4(), format.extension());
        let path = self.dir.join(&filename);

        ArtifactSlot { filename, path }
    }

    /// Resolve a file name from a download request
    ///
    /// Anything other than a single plain file name is treated as missing.
    pub fn resolve(&self, filename: &str) -> Result<(PathBuf, AudioFormat)> {
        if !is_plain_filename(filename) {
            tracing::debug!(filename, "rejecting audio lookup outside the store");
            return Err(TtsError::ArtifactNotFound(filename.to_string()));
        }

        let path = self.dir.join(filename);

        if !path.is_file() {
            return Err(TtsError::ArtifactNotFound(filename.to_string()));
        }

        Ok((path, AudioFormat::from_filename(filename)))
    }
}

fn is_plain_filename(filename: &str) -> bool {
    let mut components = Path::new(filename).components();

    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == filename
    ) && !filename.contains(['/', '\\'])
}
