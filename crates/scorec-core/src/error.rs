//! Error types for the scorec engine.

use crate::duration::TickTime;
use crate::expand::EntryOrigin;
use thiserror::Error;

/// Failures raised while resolving a single track.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A duration token outside the known vocabulary.
    #[error("Unknown duration token: {0}")]
    UnknownDurationToken(String),

    /// Resolution outside 1..=128 ticks per quarter note.
    #[error("Invalid resolution {0}: expected 1..=128 ticks per quarter note")]
    InvalidResolution(u32),

    /// A pattern reference names a pattern that was never declared.
    #[error("Unresolved pattern reference '{pattern}' at {origin}")]
    UnresolvedPatternReference { pattern: String, origin: EntryOrigin },

    /// A pattern reference with a repeat count of zero or less.
    #[error("Invalid repeat count {count} for pattern '{pattern}' at {origin}")]
    InvalidRepeatCount {
        pattern: String,
        count: i64,
        origin: EntryOrigin,
    },

    /// A delay reaching past the duration of the entry it is measured from.
    #[error("Delay of {delay} ticks at {origin} exceeds the previous duration of {available} ticks")]
    DelayExceedsDuration {
        origin: EntryOrigin,
        delay: TickTime,
        available: TickTime,
    },
}

/// Result type alias using EngineError.
pub type Result<T> = std::result::Result<T, EngineError>;

/// An engine failure attributed to the track it occurred in.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Track '{track}': {error}")]
pub struct CompileError {
    pub track: String,
    #[source]
    pub error: EngineError,
}

impl CompileError {
    pub fn new(track: impl Into<String>, error: EngineError) -> Self {
        Self {
            track: track.into(),
            error,
        }
    }
}
