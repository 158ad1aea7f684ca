//! Chain verification.

use std::fmt;

use obligo_types::GENESIS_HASH;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::record::TransactionRecord;

/// A stored record as read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub sequence: u64,
    pub payload: EntryPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Decoded(TransactionRecord),
    /// Stored bytes that do not decode as a record, with the decode error.
    Malformed(String),
}

impl LedgerEntry {
    /// Decode raw stored bytes; a decode failure becomes a malformed entry.
    pub fn from_bytes(sequence: u64, bytes: &[u8]) -> Self {
        let payload = match serde_json::from_slice(bytes) {
            Ok(record) => EntryPayload::Decoded(record),
            Err(e) => EntryPayload::Malformed(e.to_string()),
        };
        Self { sequence, payload }
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        match &self.payload {
            EntryPayload::Decoded(record) => Some(record),
            EntryPayload::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrityErrorKind {
    /// `previous_hash` does not equal the preceding record's hash.
    PreviousHashMismatch,
    /// Stored `transaction_hash` does not equal the recomputed one.
    TransactionHashMismatch,
    /// Stored bytes could not be decoded.
    MalformedRecord,
    /// Storage key not greater than the preceding key.
    SequenceOutOfOrder,
    /// Storage keys skip a number (a record is missing).
    SequenceGap,
}

impl fmt::Display for IntegrityErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrityErrorKind::PreviousHashMismatch => "PreviousHashMismatch",
            IntegrityErrorKind::TransactionHashMismatch => "TransactionHashMismatch",
            IntegrityErrorKind::MalformedRecord => "MalformedRecord",
            IntegrityErrorKind::SequenceOutOfOrder => "SequenceOutOfOrder",
            IntegrityErrorKind::SequenceGap => "SequenceGap",
        };
        f.write_str(name)
    }
}

/// One integrity finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityError {
    /// Zero-based position in the walked sequence.
    pub index: usize,
    /// Storage key of the offending record.
    pub sequence: u64,
    pub kind: IntegrityErrorKind,
    pub expected: Option<String>,
    pub found: Option<String>,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at index {} (sequence {})", self.kind, self.index, self.sequence)?;
        if let (Some(expected), Some(found)) = (&self.expected, &self.found) {
            write!(f, ": expected {expected}, found {found}")?;
        } else if let Some(found) = &self.found {
            write!(f, ": {found}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub count: usize,
    pub errors: Vec<IntegrityError>,
}

impl VerificationReport {
    pub fn first_error_index(&self) -> Option<usize> {
        self.errors.iter().map(|e| e.index).min()
    }
}

/// Walk `entries` in order and report every break in the chain.
///
/// Never stops at the first finding. A malformed entry cannot supply a hash
/// for its successor, so the successor's back-link is not checked; the break
/// is already reported as `MalformedRecord`.
pub fn verify_chain(entries: &[LedgerEntry]) -> VerificationReport {
    let mut errors = Vec::new();
    let mut expected_previous: Option<String> = Some(GENESIS_HASH.to_string());
    let mut previous_sequence: Option<u64> = None;

    for (index, entry) in entries.iter().enumerate() {
        let finding = |kind, expected: Option<String>, found: Option<String>| IntegrityError {
            index,
            sequence: entry.sequence,
            kind,
            expected,
            found,
        };

        match previous_sequence {
            Some(prev) if entry.sequence <= prev => errors.push(finding(
                IntegrityErrorKind::SequenceOutOfOrder,
                Some(format!("> {prev}")),
                Some(entry.sequence.to_string()),
            )),
            Some(prev) if entry.sequence != prev + 1 => errors.push(finding(
                IntegrityErrorKind::SequenceGap,
                Some((prev + 1).to_string()),
                Some(entry.sequence.to_string()),
            )),
            None if entry.sequence != 1 => errors.push(finding(
                IntegrityErrorKind::SequenceGap,
                Some("1".to_string()),
                Some(entry.sequence.to_string()),
            )),
            _ => {}
        }
        previous_sequence = Some(entry.sequence);

        let record = match &entry.payload {
            EntryPayload::Decoded(record) => record,
            EntryPayload::Malformed(reason) => {
                errors.push(finding(IntegrityErrorKind::MalformedRecord, None, Some(reason.clone())));
                expected_previous = None;
                continue;
            }
        };

        if let Some(expected) = &expected_previous {
            if record.previous_hash() != expected {
                errors.push(finding(
                    IntegrityErrorKind::PreviousHashMismatch,
                    Some(expected.clone()),
                    Some(record.previous_hash().to_string()),
                ));
            }
        }

        match record.compute_hash() {
            Ok(recomputed) if recomputed == record.transaction_hash() => {}
            Ok(recomputed) => errors.push(finding(
                IntegrityErrorKind::TransactionHashMismatch,
                Some(recomputed),
                Some(record.transaction_hash().to_string()),
            )),
            Err(e) => errors.push(finding(IntegrityErrorKind::MalformedRecord, None, Some(e.to_string()))),
        }

        expected_previous = Some(record.transaction_hash().to_string());
    }

    for error in &errors {
        warn!(%error, "ledger integrity finding");
    }
    debug!(count = entries.len(), errors = errors.len(), "verified ledger chain");

    VerificationReport {
        valid: errors.is_empty(),
        count: entries.len(),
        errors,
    }
}
