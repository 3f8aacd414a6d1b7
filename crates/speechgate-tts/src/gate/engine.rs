use std::path::Path;

use thiserror::Error;

use crate::types::AudioFormat;

/// Failure reported by a speech engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("{operation} failed: {message}")]
    Operation { operation: &'static str, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            message: message.into(),
        }
    }
}

/// A voice installed in the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVoice {
    /// Identifier passed back to [`SpeechEngine::set_voice`]
    pub id: String,
    pub name: String,
    pub language: String,
}

/// One live instance of a stateful, non-reentrant speech engine
///
/// Callers drive it strictly in this order: `voices`, `set_voice`,
/// `set_rate`, `set_volume`, `save_to_file`, `run_and_wait`, `stop`,
/// `dispose`. No method may be called concurrently.
pub trait SpeechEngine: Send {
    /// List installed voices
    fn voices(&mut self) -> Result<Vec<EngineVoice>, EngineError>;

    fn set_voice(&mut self, id: &str) -> Result<(), EngineError>;

    /// Speaking rate in words per minute
    fn set_rate(&mut self, words_per_minute: f32) -> Result<(), EngineError>;

    /// Volume between 0.0 and 1.0
    fn set_volume(&mut self, volume: f32) -> Result<(), EngineError>;

    /// Queue `text` to be rendered into `path`
    fn save_to_file(&mut self, text: &str, path: &Path) -> Result<(), EngineError>;

    /// Process the queue and block until the engine signals completion
    fn run_and_wait(&mut self) -> Result<(), EngineError>;

    /// Abort anything still in flight
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Release every resource the instance holds, synchronously
    fn dispose(self: Box<Self>);
}

/// Creates fresh engine instances
pub trait EngineFactory: Send + Sync + 'static {
    /// Start a new engine instance
    fn create(&self) -> Result<Box<dyn SpeechEngine>, EngineError>;

    /// Encoding of the files the engine writes
    fn format(&self) -> AudioFormat;
}
