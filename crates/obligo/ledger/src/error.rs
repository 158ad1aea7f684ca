use std::path::PathBuf;

use thiserror::Error;

/// Fatal ledger failures.
///
/// Broken chains are not errors: they are findings in a
/// [`VerificationReport`](crate::VerificationReport).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger directory {path} is locked by another handle")]
    Locked { path: PathBuf },

    #[error("sequence {0} already exists in storage")]
    SequenceExists(u64),

    #[error("sequence {0} not found in storage")]
    SequenceNotFound(u64),

    #[error("sequence number space exhausted")]
    SequenceOverflow,
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
