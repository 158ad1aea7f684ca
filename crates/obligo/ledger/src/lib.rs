#![deny(unsafe_code)]
//! # obligo-ledger
//!
//! Append-only, hash-chained record of analysis runs.
//!
//! ```text
//! GENESIS ◄── record 1 ◄── record 2 ◄── ... ◄── head
//!             (previous_hash links, transaction_hash = H(record without itself))
//! ```
//!
//! - [`seal_record`]: build a [`TransactionRecord`] chained onto a given hash
//! - [`LedgerHandle`]: open a ledger, append under the next sequence number, verify, close
//! - [`verify_chain`]: walk stored entries and report every break, never aborting early
//! - [`LedgerStorage`]: keyed byte store; [`DirectoryStorage`] (one JSON file per
//!   record, lock file) and [`MemoryStorage`]

pub mod error;
pub mod handle;
pub mod record;
pub mod storage;
pub mod verify;

pub use error::{LedgerError, Result};
pub use handle::LedgerHandle;
pub use record::{
    seal_record, ChainLink, EnvironmentDescriptor, InputDescriptor, InputFormat, OutputHashes,
    TransactionRecord, DISCLAIMER, RECORD_HASH_DOMAIN, RECORD_VERSION,
};
pub use storage::{DirectoryStorage, LedgerStorage, MemoryStorage, LOCK_FILE_NAME};
pub use verify::{
    verify_chain, EntryPayload, IntegrityError, IntegrityErrorKind, LedgerEntry,
    VerificationReport,
};
