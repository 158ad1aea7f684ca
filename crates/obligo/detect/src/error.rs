use thiserror::Error;

/// Structural errors raised by the registry and the detector.
///
/// Document content never produces one of these: finding nothing is an empty
/// result, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("pattern {pattern_id}: invalid rule: {reason}")]
    InvalidRule { pattern_id: String, reason: String },

    #[error("pattern {pattern_id}: declares {declared} capture names but the rule has {actual} groups")]
    CaptureCountMismatch {
        pattern_id: String,
        declared: usize,
        actual: usize,
    },

    #[error("duplicate pattern id in registry: {0}")]
    DuplicatePatternId(String),

    #[error("ill-formed pattern {pattern_id}: {reason}")]
    IllFormedPattern { pattern_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// Failure reported by a [`crate::LexicalMatcher`] while scanning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MatcherError(pub String);
