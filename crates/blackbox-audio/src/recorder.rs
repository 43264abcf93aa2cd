use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use blackbox_foundation::clock::{real_clock, SharedClock};
use blackbox_foundation::{AudioError, SessionError};
use blackbox_vad::{SilenceConfig, SilenceTracker};

use crate::capture::{CaptureStats, CpalFrameSource};
use crate::source::FrameSource;

/// Recording session tuning. All defaults match calibrated field values;
/// `silence.threshold` in particular must be re-tuned per microphone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub silence: SilenceConfig,
    /// Cadence at which the stop condition is evaluated, decoupled from
    /// frame arrival.
    pub poll_interval_ms: u32,
    /// Hard cap on session length; keeps a noisy room from growing the
    /// buffer forever.
    pub max_duration_ms: u32,
    /// How long the session tolerates a device that delivers nothing
    /// before treating it as failed.
    pub no_data_timeout_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: blackbox_vad::DEFAULT_SAMPLE_RATE_HZ,
            channels: blackbox_vad::CHANNELS_MONO,
            silence: SilenceConfig::default(),
            poll_interval_ms: 100,
            max_duration_ms: 30_000,
            no_data_timeout_ms: 5_000,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms as u64)
    }

    pub fn no_data_timeout(&self) -> Duration {
        Duration::from_millis(self.no_data_timeout_ms as u64)
    }
}

/// Why a session finalized. All three are normal completions, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Continuous sub-threshold audio reached the configured duration.
    Silence,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The hard duration cap was hit before silence was detected.
    MaxDuration,
}

/// A finalized clip: every frame the device delivered during the session,
/// trailing silence included (downstream transcription wants it short but
/// present).
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
    pub stop_reason: StopReason,
}

impl FinishedRecording {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Clip length implied by the sample count, independent of wall time.
    pub fn audio_duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Cooperative cancellation for a running session. Cloneable so the
/// caller can keep one end while the handle is being awaited elsewhere.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the one-session-at-a-time invariant. Starting a second session
/// while one runs fails fast instead of queuing.
pub struct Recorder {
    active: Arc<AtomicBool>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

struct SessionReady {
    sample_rate: u32,
    stats: Arc<CaptureStats>,
}

/// Clears the active flag when the worker exits, success or not.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start capturing from the microphone. Blocks until the device is
    /// open and delivering (or has refused), so device failures surface
    /// here with no partial buffer.
    pub fn start_session(
        &self,
        config: SessionConfig,
        device_name: Option<String>,
    ) -> Result<SessionHandle, SessionError> {
        let rate = config.sample_rate_hz;
        let channels = config.channels;
        self.start_session_with(config, real_clock(), move || {
            CpalFrameSource::open(device_name.as_deref(), rate, channels)
        })
    }

    /// Start a session over any frame source. The source is opened on the
    /// worker thread via `open`, since real capture streams cannot cross
    /// threads.
    pub fn start_session_with<S, F>(
        &self,
        config: SessionConfig,
        clock: SharedClock,
        open: F,
    ) -> Result<SessionHandle, SessionError>
    where
        S: FrameSource + 'static,
        F: FnOnce() -> Result<S, AudioError> + Send + 'static,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::AlreadyActive);
        }

        let guard = ActiveGuard(Arc::clone(&self.active));
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (ready_tx, ready_rx): (
            crossbeam_channel::Sender<SessionReady>,
            Receiver<SessionReady>,
        ) = crossbeam_channel::bounded(1);

        let worker = thread::Builder::new()
            .name("recording-session".to_string())
            .spawn(move || {
                let _guard = guard;

                let mut source = open().map_err(SessionError::Device)?;
                if let Err(e) = source.start() {
                    source.stop();
                    return Err(SessionError::Device(e));
                }

                let _ = ready_tx.send(SessionReady {
                    sample_rate: source.sample_rate(),
                    stats: source.stats(),
                });

                run_session(source, &config, clock, worker_cancel)
            })
            .map_err(|e| {
                self.active.store(false, Ordering::SeqCst);
                SessionError::Device(AudioError::Fatal(format!(
                    "failed to spawn session worker: {e}"
                )))
            })?;

        match ready_rx.recv() {
            Ok(ready) => Ok(SessionHandle {
                worker,
                cancel,
                stats: ready.stats,
                sample_rate: ready.sample_rate,
            }),
            // The worker exited before becoming ready; reap it so the
            // active flag is clear, and report why it refused.
            Err(_) => match worker.join() {
                Ok(Err(err)) => Err(err),
                Ok(Ok(_)) => Err(SessionError::WorkerPanicked),
                Err(_) => Err(SessionError::WorkerPanicked),
            },
        }
    }
}

/// A running recording session.
pub struct SessionHandle {
    worker: JoinHandle<Result<FinishedRecording, SessionError>>,
    cancel: CancelToken,
    stats: Arc<CaptureStats>,
    sample_rate: u32,
}

impl SessionHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Finalize within one poll interval regardless of silence state.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        Arc::clone(&self.stats)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Block until the session finalizes and take the recording. The
    /// capture device is released before this returns.
    pub fn wait(self) -> Result<FinishedRecording, SessionError> {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => Err(SessionError::WorkerPanicked),
        }
    }
}

/// The session loop: drain frames into the buffer, feed the silence
/// tracker, and evaluate the stop condition on the poll cadence.
fn run_session<S: FrameSource>(
    mut source: S,
    config: &SessionConfig,
    clock: SharedClock,
    cancel: CancelToken,
) -> Result<FinishedRecording, SessionError> {
    let mut tracker = SilenceTracker::new(&config.silence, clock.clone());
    let mut buffer: Vec<i16> = Vec::new();

    let poll = config.poll_interval();
    let silence_needed = config.silence.silence_duration();
    let started = clock.now();
    let mut next_poll = started + poll;
    let mut last_frame_at = started;

    tracing::info!(
        threshold = config.silence.threshold,
        silence_ms = config.silence.silence_duration_ms,
        max_ms = config.max_duration_ms,
        "recording session started"
    );

    let stop_reason = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }

        match source.next_frame(poll) {
            Ok(Some(frame)) => {
                // Silence is recorded, not discarded; only growth, never
                // truncation, until finalized.
                buffer.extend_from_slice(&frame.samples);
                tracker.observe(&frame.samples);
                last_frame_at = clock.now();
            }
            Ok(None) => {}
            Err(err) => {
                source.stop();
                return Err(interruption(err, buffer));
            }
        }

        let now = clock.now();

        if now.duration_since(started) >= config.max_duration() {
            tracing::warn!("session hit hard duration cap");
            break StopReason::MaxDuration;
        }

        if now.duration_since(last_frame_at) >= config.no_data_timeout() {
            source.stop();
            let err = AudioError::NoDataTimeout {
                duration: config.no_data_timeout(),
            };
            return Err(interruption(err, buffer));
        }

        if now >= next_poll {
            while next_poll <= now {
                next_poll += poll;
            }
            if tracker.is_silent() && tracker.silence_duration() >= silence_needed {
                break StopReason::Silence;
            }
        }
    };

    source.stop();
    let duration = clock.now().duration_since(started);
    tracing::info!(
        ?stop_reason,
        ?duration,
        samples = buffer.len(),
        "recording session finalized"
    );

    Ok(FinishedRecording {
        samples: buffer,
        sample_rate: source.sample_rate(),
        channels: config.channels,
        duration,
        stop_reason,
    })
}

fn interruption(err: AudioError, partial: Vec<i16>) -> SessionError {
    if partial.is_empty() {
        SessionError::Device(err)
    } else {
        SessionError::CaptureInterrupted {
            source: err,
            partial,
        }
    }
}
