//! Chat collaborator contract and the assistant persona.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// Fixed system instruction sent with every query.
pub const BB_PERSONA: &str = "You are BB, short for Black Box — a cheerful and enthusiastic AI assistant for a university open day. You always respond in an upbeat, friendly tone. Your job is to answer any question without ever asking questions in return. Stay helpful, positive, and clear, but never ask the user anything back.";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat backend unavailable: {0}")]
    Unavailable(String),

    #[error("Chat completion failed: {0}")]
    Backend(String),
}

/// Single-shot completion of a text query under a fixed persona. The
/// recorder core never assumes this succeeds; failures send the caller
/// back to listening.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, query: &str) -> Result<String, ChatError>;

    fn persona(&self) -> &str {
        BB_PERSONA
    }

    fn name(&self) -> &str;
}

/// Scripted chat backend for tests and offline runs. Replays queued
/// results, then falls back to an acknowledgement echo.
pub struct MockChat {
    script: Mutex<VecDeque<Result<String, ChatError>>>,
    queries: Mutex<Vec<String>>,
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockChat {
    pub fn new(script: Vec<Result<String, ChatError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::new(vec![Ok(reply.into())])
    }

    /// Queries received so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChat {
    async fn complete(&self, query: &str) -> Result<String, ChatError> {
        self.queries.lock().push(query.to_string());
        match self.script.lock().pop_front() {
            Some(result) => result,
            None => Ok(format!(
                "I heard \"{query}\"! I'm running offline right now, so that's all I can tell you."
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_queries_and_replays_script() {
        let chat = MockChat::with_reply("Hello from BB!");
        let reply = chat.complete("what time is it").await.unwrap();
        assert_eq!(reply, "Hello from BB!");

        let fallback = chat.complete("and now").await.unwrap();
        assert!(fallback.contains("and now"));
        assert_eq!(chat.queries(), vec!["what time is it", "and now"]);
    }

    #[test]
    fn persona_is_the_fixed_instruction() {
        let chat = MockChat::default();
        assert!(chat.persona().starts_with("You are BB"));
    }
}
