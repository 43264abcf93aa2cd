use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Assistant lifecycle. `Listening` covers an active recording session;
/// `Transcribing` and `Responding` cover the collaborator round-trips.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Initializing,
    Listening,
    Transcribing,
    Responding,
    Recovering { from_error: String },
    Stopping,
    Stopped,
}

pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    // Only live subscribers hold a receiver; transitions with no
    // subscriber are not queued anywhere.
    subscribers: Mutex<Vec<Sender<AppState>>>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState::Initializing)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn transition(&self, new_state: AppState) -> Result<(), AppError> {
        let mut current = self.state.write();

        let valid = matches!(
            (&*current, &new_state),
            (AppState::Initializing, AppState::Listening)
                | (AppState::Listening, AppState::Transcribing)
                | (AppState::Listening, AppState::Listening)
                | (AppState::Transcribing, AppState::Responding)
                | (AppState::Transcribing, AppState::Listening)
                | (AppState::Responding, AppState::Listening)
                | (AppState::Listening, AppState::Recovering { .. })
                | (AppState::Transcribing, AppState::Recovering { .. })
                | (AppState::Responding, AppState::Recovering { .. })
                | (AppState::Recovering { .. }, AppState::Listening)
                | (AppState::Recovering { .. }, AppState::Stopping)
                | (AppState::Initializing, AppState::Stopping)
                | (AppState::Listening, AppState::Stopping)
                | (AppState::Transcribing, AppState::Stopping)
                | (AppState::Responding, AppState::Stopping)
                | (AppState::Stopping, AppState::Stopped)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!("State transition: {:?} -> {:?}", *current, new_state);
        *current = new_state.clone();
        self.subscribers
            .lock()
            .retain(|tx| tx.send(new_state.clone()).is_ok());
        Ok(())
    }

    pub fn current(&self) -> AppState {
        self.state.read().clone()
    }

    /// Stream of transitions from this point on. Dropping the receiver
    /// unsubscribes; the dead sender is pruned on the next transition.
    pub fn subscribe(&self) -> Receiver<AppState> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_cycle_transitions_are_valid() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Listening).unwrap();
        mgr.transition(AppState::Transcribing).unwrap();
        mgr.transition(AppState::Responding).unwrap();
        mgr.transition(AppState::Listening).unwrap();
        assert_eq!(mgr.current(), AppState::Listening);
    }

    #[test]
    fn empty_transcript_returns_to_listening() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Listening).unwrap();
        mgr.transition(AppState::Transcribing).unwrap();
        mgr.transition(AppState::Listening).unwrap();
    }

    #[test]
    fn cannot_respond_without_transcribing() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Listening).unwrap();
        assert!(mgr.transition(AppState::Responding).is_err());
    }

    #[test]
    fn late_subscriber_starts_with_an_empty_queue() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Listening).unwrap();
        for _ in 0..500 {
            mgr.transition(AppState::Transcribing).unwrap();
            mgr.transition(AppState::Listening).unwrap();
        }

        // Transitions before the subscription must not have piled up
        let rx = mgr.subscribe();
        assert!(rx.is_empty());

        mgr.transition(AppState::Transcribing).unwrap();
        assert_eq!(rx.recv().unwrap(), AppState::Transcribing);
        assert_eq!(rx.len(), 0);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mgr = StateManager::new();
        let rx = mgr.subscribe();
        drop(rx);
        mgr.transition(AppState::Listening).unwrap();

        let live = mgr.subscribe();
        mgr.transition(AppState::Transcribing).unwrap();
        assert_eq!(live.recv().unwrap(), AppState::Transcribing);
    }

    #[test]
    fn shutdown_path() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Listening).unwrap();
        mgr.transition(AppState::Stopping).unwrap();
        mgr.transition(AppState::Stopped).unwrap();
        assert_eq!(mgr.current(), AppState::Stopped);
    }
}
