use obligo_types::Field;
use thiserror::Error;

/// Errors raised while building an obligation engine.
///
/// Instantiating obligations never fails: missing evidence is an `OPEN`
/// status, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid {field} vocabulary: {reason}")]
    InvalidVocabulary { field: Field, reason: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
