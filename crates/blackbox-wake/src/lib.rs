//! Wake-phrase matching over transcripts.
//!
//! Decides whether a transcript addresses the assistant and, if so,
//! strips the activation phrase to leave the residual query. Matching is
//! case-insensitive and whole-word, so "helpful" does not trip "help".

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Activation phrases the assistant answers to, longest listed first so
/// "hey black box" wins over the bare "bb".
pub const DEFAULT_PHRASES: &[&str] = &[
    "hey black box",
    "hello black box",
    "hey bb",
    "hello bb",
    "bb",
    "help",
];

#[derive(Error, Debug)]
pub enum WakeError {
    #[error("Empty phrase set")]
    EmptyPhraseSet,

    #[error("Failed to compile phrase pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub phrases: Vec<String>,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A compiled set of wake phrases.
pub struct WakePhraseSet {
    matcher: Regex,
    stripper: Regex,
}

impl WakePhraseSet {
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Result<Self, WakeError> {
        let mut escaped: Vec<String> = phrases
            .iter()
            .map(|p| regex::escape(p.as_ref().trim()))
            .filter(|p| !p.is_empty())
            .collect();
        if escaped.is_empty() {
            return Err(WakeError::EmptyPhraseSet);
        }
        // Longest alternative first, or a contained phrase ("bb") would
        // shadow its superstring ("hey bb") and leave half of it behind.
        escaped.sort_by_key(|p| std::cmp::Reverse(p.len()));
        let alternation = escaped.join("|");

        let matcher = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?;
        // The stripper also eats whitespace before the phrase and the
        // punctuation that trails it ("Hey BB, ..." -> "...").
        let stripper = Regex::new(&format!(r"(?i)\s*\b(?:{})\b[\s,.!?;:]*", alternation))?;

        Ok(Self { matcher, stripper })
    }

    pub fn from_config(config: &WakeConfig) -> Result<Self, WakeError> {
        Self::new(&config.phrases)
    }

    /// Whether the transcript contains any activation phrase.
    pub fn matches(&self, transcript: &str) -> bool {
        self.matcher.is_match(transcript)
    }

    /// Remove every phrase occurrence and trim. An empty result means
    /// "trigger with no query": the caller must not forward it onward.
    pub fn strip(&self, transcript: &str) -> String {
        self.stripper.replace_all(transcript, " ").trim().to_string()
    }
}

impl Default for WakePhraseSet {
    fn default() -> Self {
        // The built-in phrase list always compiles
        Self::new(DEFAULT_PHRASES).expect("default wake phrases must compile")
    }
}
