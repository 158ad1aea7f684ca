use std::path::Path;

use obligo_types::GENESIS_HASH;
use tracing::{info, warn};

use crate::error::{LedgerError, Result};
use crate::record::{
    seal_record, EnvironmentDescriptor, InputDescriptor, OutputHashes, TransactionRecord,
};
use crate::storage::{DirectoryStorage, LedgerStorage, MemoryStorage};
use crate::verify::{verify_chain, LedgerEntry, VerificationReport};

/// Position of the chain head: where the next record goes and what it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChainHead {
    last_sequence: u64,
    last_hash: String,
}

/// An open ledger.
///
/// The handle is the only writer of its storage: `append` takes `&mut self`
/// and directory storage holds a lock file for as long as the handle lives.
#[derive(Debug)]
pub struct LedgerHandle<S: LedgerStorage = DirectoryStorage> {
    storage: S,
    head: ChainHead,
}

impl LedgerHandle<DirectoryStorage> {
    /// Open the ledger in `dir`, creating the directory if needed.
    ///
    /// Fails with [`LedgerError::Locked`] while another handle holds it. A
    /// process that exits without dropping its handle leaves the lock file
    /// behind; clear it with [`DirectoryStorage::break_lock`] once that
    /// process is known to be gone.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_storage(DirectoryStorage::open(dir)?)
    }
}

impl LedgerHandle<MemoryStorage> {
    pub fn in_memory() -> Self {
        Self {
            storage: MemoryStorage::new(),
            head: ChainHead {
                last_sequence: 0,
                last_hash: GENESIS_HASH.to_string(),
            },
        }
    }
}

impl<S: LedgerStorage> LedgerHandle<S> {
    /// Wrap existing storage, locating the current chain head.
    pub fn with_storage(storage: S) -> Result<Self> {
        let head = load_head(&storage)?;
        info!(
            records = head.last_sequence,
            head = %head.last_hash,
            "opened ledger"
        );
        Ok(Self { storage, head })
    }

    /// Seal a record onto the head of the chain and store it under the next
    /// sequence number.
    pub fn append(
        &mut self,
        input_descriptor: InputDescriptor,
        output_hashes: OutputHashes,
        environment_descriptor: EnvironmentDescriptor,
    ) -> Result<TransactionRecord> {
        let sequence = self
            .head
            .last_sequence
            .checked_add(1)
            .ok_or(LedgerError::SequenceOverflow)?;
        let record = seal_record(
            input_descriptor,
            output_hashes,
            environment_descriptor,
            self.head.last_hash.clone(),
        )?;
        let bytes = serde_json::to_vec_pretty(&record)?;
        self.storage.write(sequence, &bytes)?;

        self.head = ChainHead {
            last_sequence: sequence,
            last_hash: record.transaction_hash().to_string(),
        };
        info!(
            sequence,
            transaction_id = %record.transaction_id,
            transaction_hash = %record.transaction_hash(),
            "appended ledger record"
        );
        Ok(record)
    }

    /// Every stored entry in sequence order. Undecodable records are returned
    /// as malformed entries rather than errors.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        self.storage
            .sequences()?
            .into_iter()
            .map(|sequence| -> Result<LedgerEntry> {
                let bytes = self.storage.read(sequence)?;
                Ok(LedgerEntry::from_bytes(sequence, &bytes))
            })
            .collect()
    }

    /// Decoded records only, in sequence order.
    pub fn records(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter_map(|entry| entry.record().cloned())
            .collect())
    }

    /// Verify the whole stored chain. Only storage failures are errors.
    pub fn verify(&self) -> Result<VerificationReport> {
        let report = verify_chain(&self.entries()?);
        info!(valid = report.valid, count = report.count, "verified ledger");
        Ok(report)
    }

    /// Hash the next appended record will link to.
    pub fn head_hash(&self) -> &str {
        &self.head.last_hash
    }

    /// Sequence number of the last stored record, 0 when empty.
    pub fn last_sequence(&self) -> u64 {
        self.head.last_sequence
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Release the ledger. Dropping the handle does the same but cannot
    /// report a failure to remove the lock.
    pub fn close(self) -> Result<()> {
        self.storage.close()
    }
}

/// Head of the stored chain: the highest sequence number and the hash of the
/// newest record that still decodes.
fn load_head<S: LedgerStorage>(storage: &S) -> Result<ChainHead> {
    let sequences = storage.sequences()?;
    let Some(&last_sequence) = sequences.last() else {
        return Ok(ChainHead {
            last_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
        });
    };

    for &sequence in sequences.iter().rev() {
        let entry = LedgerEntry::from_bytes(sequence, &storage.read(sequence)?);
        match entry.record() {
            Some(record) => {
                return Ok(ChainHead {
                    last_sequence,
                    last_hash: record.transaction_hash().to_string(),
                })
            }
            None => warn!(sequence, "skipping malformed record while locating chain head"),
        }
    }

    Ok(ChainHead {
        last_sequence,
        last_hash: GENESIS_HASH.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::*;

    #[test]
    fn first_record_links_to_genesis() {
        let mut ledger = LedgerHandle::in_memory();
        let record = ledger.append(input(0), outputs(0), environment()).unwrap();
        assert_eq!(record.previous_hash(), GENESIS_HASH);
        assert_eq!(ledger.last_sequence(), 1);
        assert_eq!(ledger.head_hash(), record.transaction_hash());
    }

    #[test]
    fn records_chain_in_order() {
        let mut ledger = LedgerHandle::in_memory();
        let a = ledger.append(input(0), outputs(0), environment()).unwrap();
        let b = ledger.append(input(1), outputs(1), environment()).unwrap();
        assert_eq!(b.previous_hash(), a.transaction_hash());
        assert_eq!(ledger.storage().sequences().unwrap(), vec![1, 2]);
        assert_eq!(ledger.records().unwrap(), vec![a, b]);
    }

    #[test]
    fn reopening_storage_resumes_at_head() {
        let mut ledger = LedgerHandle::in_memory();
        ledger.append(input(0), outputs(0), environment()).unwrap();
        let last = ledger.append(input(1), outputs(1), environment()).unwrap();

        let reopened = LedgerHandle::with_storage(ledger.storage().clone()).unwrap();
        assert_eq!(reopened.last_sequence(), 2);
        assert_eq!(reopened.head_hash(), last.transaction_hash());
    }

    #[test]
    fn sequence_continues_after_gap() {
        let mut ledger = LedgerHandle::in_memory();
        for i in 0..3 {
            ledger.append(input(i), outputs(i), environment()).unwrap();
        }
        ledger.storage_mut().remove(2);

        let mut reopened = LedgerHandle::with_storage(ledger.storage().clone()).unwrap();
        reopened.append(input(9), outputs(9), environment()).unwrap();
        assert_eq!(reopened.storage().sequences().unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn malformed_tail_falls_back_to_last_good_hash() {
        let mut ledger = LedgerHandle::in_memory();
        let good = ledger.append(input(0), outputs(0), environment()).unwrap();
        ledger.append(input(1), outputs(1), environment()).unwrap();
        ledger.storage_mut().overwrite(2, b"garbage".to_vec());

        let reopened = LedgerHandle::with_storage(ledger.storage().clone()).unwrap();
        assert_eq!(reopened.last_sequence(), 2);
        assert_eq!(reopened.head_hash(), good.transaction_hash());
    }
}
