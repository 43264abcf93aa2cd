//! BB ("Black Box"), a listen-always voice assistant front end.
//!
//! The pipeline: record until the speaker goes silent, transcribe the
//! clip, check for a wake phrase, strip it, send the residual query to
//! the chat collaborator, print the reply. Transcription and chat are
//! reached through traits; the shipped binary wires in the offline test
//! doubles since real backends are deployment-specific.

pub mod assistant;
pub mod config;
pub mod runtime;
pub mod trigger;
