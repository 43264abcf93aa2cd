use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Recording session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Errors surfaced by the voice-activity recorder.
///
/// All variants are recoverable from the caller's perspective: the recorder
/// reports them and returns to idle, it never terminates the process.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Starting a session while one is running is a programming error;
    /// the running session's buffer is left untouched.
    #[error("A recording session is already active")]
    AlreadyActive,

    /// The capture device could not be opened. No partial buffer exists.
    #[error("Capture device error: {0}")]
    Device(#[from] AudioError),

    /// The device failed mid-session. The samples captured before the
    /// failure are attached for diagnostics; they must not be treated as
    /// a complete utterance.
    #[error("Capture interrupted after {} samples: {source}", partial.len())]
    CaptureInterrupted {
        source: AudioError,
        partial: Vec<i16>,
    },

    #[error("Recording session worker panicked")]
    WorkerPanicked,
}

impl SessionError {
    /// Whether the caller can simply re-listen after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::WorkerPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_interrupted_reports_partial_length() {
        let err = SessionError::CaptureInterrupted {
            source: AudioError::DeviceDisconnected,
            partial: vec![0i16; 441],
        };
        assert!(err.to_string().contains("441 samples"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn worker_panic_is_not_recoverable() {
        assert!(!SessionError::WorkerPanicked.is_recoverable());
    }
}
