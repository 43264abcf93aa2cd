//! Transcription collaborator contract.
//!
//! The recorder hands a finished clip to a `Transcriber` exactly once; no
//! retry policy lives here. An empty transcript is a normal outcome
//! (`Ok(None)`), not an error: the caller simply re-listens.

use async_trait::async_trait;
use thiserror::Error;

use blackbox_audio::FinishedRecording;

pub mod plugins;
pub mod wav;

pub use plugins::{MockScript, MockTranscriber, NoOpTranscriber};

/// Best-effort text for one utterance. Opaque to the core; the only
/// consumer that looks inside is the wake-phrase matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
pub enum SttError {
    #[error("Transcription backend unavailable: {0}")]
    Unavailable(String),

    #[error("Transcription failed: {0}")]
    Backend(String),

    #[error("Failed to encode audio container: {0}")]
    Encode(#[from] hound::Error),
}

/// Single-shot transcription of a finished recording.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `Ok(None)` means the service produced no usable text; callers
    /// treat that as "re-listen", never as fatal.
    async fn transcribe(&self, clip: &FinishedRecording) -> Result<Option<Transcript>, SttError>;

    fn name(&self) -> &str;
}
