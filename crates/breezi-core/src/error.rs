//! Error taxonomy for the BreezI core.
//!
//! Propagation policy:
//! - `Provider` is always recovered inside the PersonaRouter (routing never
//!   fails); it only escapes from direct LLM calls such as response generation,
//!   where callers fall back to canned replies.
//! - `NotFound` surfaces to the admin caller (a failed report action must be visible).
//! - `NotYetEligible` / `AlreadyOpen` surface to the end user as distinct rejections.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A moderation record, report, diary entry, or capsule does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// The LLM provider failed, timed out, or returned malformed content.
    #[error("provider error: {0}")]
    Provider(String),
    /// The capsule's open date has not been reached yet.
    #[error("capsule is not yet eligible to open")]
    NotYetEligible,
    /// The capsule was already opened; opening happens exactly once.
    #[error("capsule has already been opened")]
    AlreadyOpen,
    /// Malformed input, e.g. a moderation action outside {warn, suspend, ignore}.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The backing sled store or record (de)serialization failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for CoreError {
    fn from(e: sled::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Storage(format!("record serialization: {}", e))
    }
}
