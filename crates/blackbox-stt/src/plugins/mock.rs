//! Configurable mock transcriber for tests and offline runs.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use blackbox_audio::FinishedRecording;

use crate::{SttError, Transcriber, Transcript};

/// One scripted outcome of a transcription call.
#[derive(Debug, Clone)]
pub enum MockScript {
    Text(String),
    Empty,
    Fail(String),
}

/// Replays a script of transcription results, then repeats the last
/// configured fallback (empty by default).
#[derive(Debug)]
pub struct MockTranscriber {
    script: Mutex<VecDeque<MockScript>>,
    fallback: MockScript,
    calls: Mutex<Vec<usize>>,
}

impl MockTranscriber {
    pub fn new(script: Vec<MockScript>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: MockScript::Empty,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call returns the same transcript.
    pub fn with_transcript(text: impl Into<String>) -> Self {
        let mut mock = Self::new(Vec::new());
        mock.fallback = MockScript::Text(text.into());
        mock
    }

    pub fn with_fallback(mut self, fallback: MockScript) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sample counts of the clips seen so far, in call order.
    pub fn clip_sizes(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }

    pub fn calls_made(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, clip: &FinishedRecording) -> Result<Option<Transcript>, SttError> {
        self.calls.lock().push(clip.samples.len());
        let step = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            MockScript::Text(text) => Ok(Some(Transcript::new(text))),
            MockScript::Empty => Ok(None),
            MockScript::Fail(reason) => Err(SttError::Backend(reason)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_audio::StopReason;
    use std::time::Duration;

    fn clip(n: usize) -> FinishedRecording {
        FinishedRecording {
            samples: vec![0i16; n],
            sample_rate: 44_100,
            channels: 1,
            duration: Duration::from_millis(100),
            stop_reason: StopReason::Silence,
        }
    }

    #[tokio::test]
    async fn replays_script_then_fallback() {
        let mock = MockTranscriber::new(vec![
            MockScript::Text("hey bb hello".into()),
            MockScript::Fail("boom".into()),
        ]);

        let first = mock.transcribe(&clip(10)).await.unwrap().unwrap();
        assert_eq!(first.as_str(), "hey bb hello");
        assert!(mock.transcribe(&clip(20)).await.is_err());
        assert!(mock.transcribe(&clip(30)).await.unwrap().is_none());
        assert_eq!(mock.clip_sizes(), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn fixed_transcript_repeats() {
        let mock = MockTranscriber::with_transcript("bb");
        for _ in 0..3 {
            let t = mock.transcribe(&clip(1)).await.unwrap().unwrap();
            assert_eq!(t.as_str(), "bb");
        }
        assert_eq!(mock.calls_made(), 3);
    }
}
