//! Seams to the services that produce analysable text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical text plus the rules that changed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalText {
    pub text: String,
    /// Names of the rules that modified the text, in application order.
    pub applied_rules: Vec<String>,
    /// `change_fingerprint` of `text`.
    pub hash: String,
}

/// Fixed, order-sensitive text normalization run before detection.
pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, raw: &str) -> CanonicalText;
}

/// Why a PDF produced no analysable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    Encrypted,
    ScannedSuspect,
    Empty,
    ParseError,
}

impl RejectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::Encrypted => "ENCRYPTED",
            RejectionCode::ScannedSuspect => "SCANNED_SUSPECT",
            RejectionCode::Empty => "EMPTY",
            RejectionCode::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfExtraction {
    Extracted { text: String, page_count: usize },
    Rejected(RejectionCode),
}

/// Opaque PDF text extraction service.
pub trait PdfExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> PdfExtraction;
}

impl<F> PdfExtractor for F
where
    F: Fn(&[u8]) -> PdfExtraction + Send + Sync,
{
    fn extract(&self, bytes: &[u8]) -> PdfExtraction {
        self(bytes)
    }
}
