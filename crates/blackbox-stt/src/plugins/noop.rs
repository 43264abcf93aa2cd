//! No-op transcriber for running the pipeline without a backend.

use async_trait::async_trait;

use blackbox_audio::FinishedRecording;

use crate::{SttError, Transcriber, Transcript};

/// Never produces text. Every clip comes back as an empty transcript,
/// so the caller's re-listen path gets exercised and nothing else.
#[derive(Debug, Clone, Default)]
pub struct NoOpTranscriber;

impl NoOpTranscriber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transcriber for NoOpTranscriber {
    async fn transcribe(&self, clip: &FinishedRecording) -> Result<Option<Transcript>, SttError> {
        tracing::debug!(samples = clip.samples.len(), "noop transcriber discarding clip");
        Ok(None)
    }

    fn name(&self) -> &str {
        "noop"
    }
}
