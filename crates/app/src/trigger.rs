//! Keyboard listener for the manual override.
//!
//! Keyboard input flows through an explicit event channel the runtime
//! selects on, rather than process-wide flags polled from the loop.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Stop the current recording now and answer it without requiring a
    /// wake phrase.
    ForceTrigger,
    /// Quit the assistant.
    Quit,
}

/// Reads stdin lines on a dedicated thread: an empty line or `t` forces
/// a trigger, `q` quits. The thread parks on stdin and is reaped when
/// the process exits.
pub struct TriggerListener {
    _handle: JoinHandle<()>,
}

impl TriggerListener {
    pub fn spawn(tx: mpsc::UnboundedSender<TriggerEvent>) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("trigger-listener".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                let mut line = String::new();
                loop {
                    line.clear();
                    match stdin.read_line(&mut line) {
                        Ok(0) => break, // stdin closed
                        Ok(_) => {
                            let event = match line.trim() {
                                "" | "t" | "T" => TriggerEvent::ForceTrigger,
                                "q" | "Q" => TriggerEvent::Quit,
                                other => {
                                    tracing::debug!(input = other, "ignoring keyboard input");
                                    continue;
                                }
                            };
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("trigger listener read failed: {}", e);
                            break;
                        }
                    }
                }
            })?;
        Ok(Self { _handle: handle })
    }
}
