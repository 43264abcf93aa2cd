use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use blackbox_foundation::clock::SharedClock;
use blackbox_foundation::AudioError;

use crate::capture::CaptureStats;

/// A timestamped block of signed 16-bit mono samples. Owned by the
/// recording session until appended to the output buffer.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Arc<[i16]>,
    pub timestamp: Instant,
    pub sample_rate: u32,
}

/// The capture device seam: a continuous stream of fixed-format frames
/// with start/stop control and delivery-error reporting.
///
/// Implementations are created on the session worker thread (cpal streams
/// are not `Send`), so the trait carries no `Send` bound; the factory
/// closure that opens the source does.
pub trait FrameSource {
    fn start(&mut self) -> Result<(), AudioError>;

    /// Next frame, waiting up to `timeout`. `Ok(None)` means no frame
    /// arrived within the timeout; `Err` means delivery failed.
    fn next_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, AudioError>;

    fn stop(&mut self);

    /// Actual device sample rate, which may differ from the requested one.
    fn sample_rate(&self) -> u32;

    fn stats(&self) -> Arc<CaptureStats>;
}

impl FrameSource for Box<dyn FrameSource> {
    fn start(&mut self) -> Result<(), AudioError> {
        (**self).start()
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, AudioError> {
        (**self).next_frame(timeout)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn stats(&self) -> Arc<CaptureStats> {
        (**self).stats()
    }
}

/// One step of a scripted capture, for deterministic session tests.
pub enum ScriptStep {
    /// Deliver a frame; the scripted clock advances by the frame duration.
    Frame(Vec<i16>),
    /// Report a delivery error.
    Fail(AudioError),
    /// Deliver nothing for the given span of virtual time.
    Gap(Duration),
}

/// A `FrameSource` that replays a script against a virtual clock.
///
/// Each delivered frame advances the clock by the frame's duration, and
/// an exhausted script either repeats a tail frame forever or idles by
/// the caller's timeout, mimicking a device that has gone quiet.
pub struct ScriptedFrameSource {
    steps: VecDeque<ScriptStep>,
    repeat: Option<Vec<i16>>,
    clock: SharedClock,
    sample_rate: u32,
    stats: Arc<CaptureStats>,
    started: bool,
}

impl ScriptedFrameSource {
    pub fn new(steps: Vec<ScriptStep>, clock: SharedClock, sample_rate: u32) -> Self {
        Self {
            steps: steps.into(),
            repeat: None,
            clock,
            sample_rate,
            stats: Arc::new(CaptureStats::default()),
            started: false,
        }
    }

    /// After the script runs out, keep delivering this frame forever.
    pub fn with_repeating_tail(mut self, frame: Vec<i16>) -> Self {
        self.repeat = Some(frame);
        self
    }

    fn deliver(&mut self, samples: Vec<i16>) -> AudioFrame {
        let frame_duration = Duration::from_secs_f64(samples.len() as f64 / self.sample_rate as f64);
        self.clock.sleep(frame_duration);
        self.stats.frames_captured.fetch_add(1, Ordering::Relaxed);
        self.stats
            .samples_captured
            .fetch_add(samples.len() as u64, Ordering::Relaxed);
        AudioFrame {
            samples: samples.into(),
            timestamp: self.clock.now(),
            sample_rate: self.sample_rate,
        }
    }
}

impl FrameSource for ScriptedFrameSource {
    fn start(&mut self) -> Result<(), AudioError> {
        self.started = true;
        Ok(())
    }

    fn next_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, AudioError> {
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(samples)) => Ok(Some(self.deliver(samples))),
            Some(ScriptStep::Fail(err)) => Err(err),
            Some(ScriptStep::Gap(span)) => {
                self.clock.sleep(span);
                Ok(None)
            }
            None => match self.repeat.clone() {
                Some(samples) => Ok(Some(self.deliver(samples))),
                None => {
                    self.clock.sleep(timeout);
                    Ok(None)
                }
            },
        }
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stats(&self) -> Arc<CaptureStats> {
        self.stats.clone()
    }
}
