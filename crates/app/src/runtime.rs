//! The listen → transcribe → match → respond loop.

use std::sync::Arc;

use tokio::sync::mpsc;

use blackbox_audio::{
    CpalFrameSource, FrameSource, Recorder, SessionConfig, StopReason,
};
use blackbox_foundation::clock::{real_clock, SharedClock};
use blackbox_foundation::{
    AppError, AppState, AudioError, SessionError, ShutdownGuard, StateManager,
};
use blackbox_stt::{SttError, Transcriber};
use blackbox_wake::WakePhraseSet;

use crate::assistant::{ChatBackend, ChatError};
use crate::config::AppConfig;
use crate::trigger::TriggerEvent;

/// Opens a frame source on the session worker thread. Boxed so tests can
/// substitute scripted sources for the microphone.
pub type SourceFactory = Arc<dyn Fn() -> Result<Box<dyn FrameSource>, AudioError> + Send + Sync>;

/// Result of one listen cycle. Everything except `ShuttingDown` sends
/// the loop straight back to listening.
#[derive(Debug)]
pub enum CycleOutcome {
    Replied { transcript: String, reply: String },
    /// Transcription produced no usable text.
    EmptyTranscript,
    /// The transcript never addressed the assistant.
    NotAddressed { transcript: String },
    /// A wake phrase with nothing after it ("bb").
    EmptyQuery,
    /// The device delivered no samples at all.
    NoAudio,
    SessionFailed(SessionError),
    TranscriberFailed(SttError),
    ChatFailed(ChatError),
    ShuttingDown,
}

pub struct Runtime {
    config: AppConfig,
    recorder: Recorder,
    wake: WakePhraseSet,
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatBackend>,
    state: StateManager,
    clock: SharedClock,
    source_factory: SourceFactory,
}

impl Runtime {
    /// Microphone-backed runtime.
    pub fn new(
        config: AppConfig,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatBackend>,
    ) -> Result<Self, AppError> {
        let session = config.session.clone();
        let device = config.device.clone();
        let factory: SourceFactory = Arc::new(move || {
            CpalFrameSource::open(device.as_deref(), session.sample_rate_hz, session.channels)
                .map(|s| Box::new(s) as Box<dyn FrameSource>)
        });
        Self::with_source_factory(config, transcriber, chat, factory, real_clock())
    }

    /// Runtime over an arbitrary frame source, used by tests.
    pub fn with_source_factory(
        config: AppConfig,
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatBackend>,
        source_factory: SourceFactory,
        clock: SharedClock,
    ) -> Result<Self, AppError> {
        let wake = WakePhraseSet::from_config(&config.wake)
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self {
            config,
            recorder: Recorder::new(),
            wake,
            transcriber,
            chat,
            state: StateManager::new(),
            clock,
            source_factory,
        })
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }

    /// Record one clip, answering cancellation, shutdown, and manual
    /// triggers while it runs. Returns the recording plus whether the
    /// manual override fired.
    async fn record_clip(
        &self,
        shutdown: &ShutdownGuard,
        triggers: &mut mpsc::UnboundedReceiver<TriggerEvent>,
    ) -> Result<(Result<blackbox_audio::FinishedRecording, SessionError>, bool), AppError> {
        let factory = Arc::clone(&self.source_factory);
        let handle = match self.recorder.start_session_with(
            self.config.session.clone(),
            self.clock.clone(),
            move || factory(),
        ) {
            Ok(handle) => handle,
            Err(err) => return Ok((Err(err), false)),
        };

        let token = handle.cancel_token();
        let mut waiter = tokio::task::spawn_blocking(move || handle.wait());

        let mut forced = false;
        let mut cancelled = false;
        let mut triggers_open = true;

        let join_result = loop {
            tokio::select! {
                res = &mut waiter => break res,
                _ = shutdown.wait(), if !cancelled => {
                    token.cancel();
                    cancelled = true;
                }
                event = triggers.recv(), if triggers_open => {
                    match event {
                        Some(TriggerEvent::ForceTrigger) => {
                            tracing::info!("manual trigger: finalizing recording now");
                            forced = true;
                            token.cancel();
                            cancelled = true;
                        }
                        Some(TriggerEvent::Quit) => {
                            shutdown.request_shutdown();
                            token.cancel();
                            cancelled = true;
                        }
                        None => triggers_open = false,
                    }
                }
            }
        };

        let session_result = join_result
            .map_err(|_| AppError::Session(SessionError::WorkerPanicked))?;
        Ok((session_result, forced))
    }

    /// One full listen cycle.
    pub async fn run_cycle(
        &self,
        shutdown: &ShutdownGuard,
        triggers: &mut mpsc::UnboundedReceiver<TriggerEvent>,
    ) -> Result<CycleOutcome, AppError> {
        let (session_result, forced) = self.record_clip(shutdown, triggers).await?;

        let clip = match session_result {
            Ok(clip) => clip,
            Err(err) => {
                if !err.is_recoverable() {
                    return Err(err.into());
                }
                tracing::warn!("recording session failed: {}", err);
                self.state.transition(AppState::Recovering {
                    from_error: err.to_string(),
                })?;
                self.state.transition(AppState::Listening)?;
                return Ok(CycleOutcome::SessionFailed(err));
            }
        };

        if shutdown.is_shutdown_requested() && !forced {
            // Cancelled for shutdown; the clip is discarded.
            return Ok(CycleOutcome::ShuttingDown);
        }

        if clip.is_empty() {
            tracing::debug!("session finalized with no audio");
            return Ok(CycleOutcome::NoAudio);
        }

        if clip.stop_reason == StopReason::MaxDuration {
            tracing::warn!(
                duration = ?clip.duration,
                "clip hit the duration cap; transcribing what we have"
            );
        }

        self.state.transition(AppState::Transcribing)?;
        let transcript = match self.transcriber.transcribe(&clip).await {
            Ok(Some(t)) => t,
            Ok(None) => {
                tracing::info!("no transcribed text; listening again");
                self.state.transition(AppState::Listening)?;
                return Ok(CycleOutcome::EmptyTranscript);
            }
            Err(err) => {
                tracing::warn!("transcription failed: {}", err);
                self.state.transition(AppState::Recovering {
                    from_error: err.to_string(),
                })?;
                self.state.transition(AppState::Listening)?;
                return Ok(CycleOutcome::TranscriberFailed(err));
            }
        };

        // The manual override answers whatever was said; otherwise the
        // transcript must contain a wake phrase.
        let query = if forced {
            transcript.as_str().trim().to_string()
        } else if self.wake.matches(transcript.as_str()) {
            self.wake.strip(transcript.as_str())
        } else {
            tracing::debug!(transcript = %transcript, "not addressed to the assistant");
            self.state.transition(AppState::Listening)?;
            return Ok(CycleOutcome::NotAddressed {
                transcript: transcript.into_string(),
            });
        };

        if query.is_empty() {
            tracing::info!("wake phrase with no query");
            self.state.transition(AppState::Listening)?;
            return Ok(CycleOutcome::EmptyQuery);
        }

        self.state.transition(AppState::Responding)?;
        match self.chat.complete(&query).await {
            Ok(reply) => {
                self.state.transition(AppState::Listening)?;
                Ok(CycleOutcome::Replied {
                    transcript: transcript.into_string(),
                    reply,
                })
            }
            Err(err) => {
                tracing::warn!("chat completion failed: {}", err);
                self.state.transition(AppState::Recovering {
                    from_error: err.to_string(),
                })?;
                self.state.transition(AppState::Listening)?;
                Ok(CycleOutcome::ChatFailed(err))
            }
        }
    }

    /// Main loop: listen until shutdown.
    pub async fn run(
        &self,
        shutdown: ShutdownGuard,
        mut triggers: mpsc::UnboundedReceiver<TriggerEvent>,
    ) -> Result<(), AppError> {
        self.state.transition(AppState::Listening)?;
        println!("BB is listening. Speak, then pause; press Enter to force an answer, q to quit.");

        while !shutdown.is_shutdown_requested() {
            match self.run_cycle(&shutdown, &mut triggers).await? {
                CycleOutcome::Replied { transcript, reply } => {
                    println!("\nYou said: {transcript}");
                    println!("\nBB: {reply}\n");
                }
                CycleOutcome::NotAddressed { transcript } => {
                    tracing::info!(%transcript, "heard speech not addressed to BB");
                }
                CycleOutcome::EmptyQuery => {
                    println!("\nBB: Yes? Say a question after my name and I'll answer it!\n");
                }
                CycleOutcome::EmptyTranscript | CycleOutcome::NoAudio => {}
                CycleOutcome::SessionFailed(err) => {
                    tracing::warn!("re-listening after session failure: {}", err);
                }
                CycleOutcome::TranscriberFailed(err) => {
                    tracing::warn!("re-listening after transcription failure: {}", err);
                }
                CycleOutcome::ChatFailed(err) => {
                    tracing::warn!("re-listening after chat failure: {}", err);
                }
                CycleOutcome::ShuttingDown => break,
            }
        }

        self.state.transition(AppState::Stopping)?;
        self.state.transition(AppState::Stopped)?;
        tracing::info!("assistant stopped");
        Ok(())
    }
}
