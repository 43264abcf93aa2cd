pub mod capture;
pub mod recorder;
pub mod source;

// Public API
pub use capture::{CaptureStats, CpalFrameSource};
pub use recorder::{
    CancelToken, FinishedRecording, Recorder, SessionConfig, SessionHandle, StopReason,
};
pub use source::{AudioFrame, FrameSource, ScriptStep, ScriptedFrameSource};
