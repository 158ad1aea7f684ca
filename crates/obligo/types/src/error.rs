use thiserror::Error;

/// Returned when a serialized tag (operator class, field, obligation type)
/// does not name a known variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} tag: {tag}")]
pub struct TagParseError {
    pub kind: &'static str,
    pub tag: String,
}

impl TagParseError {
    pub fn new(kind: &'static str, tag: impl Into<String>) -> Self {
        Self {
            kind,
            tag: tag.into(),
        }
    }
}
