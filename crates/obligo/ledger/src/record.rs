//! Transaction records and their self hash.

use std::fmt;

use chrono::{DateTime, Utc};
use obligo_types::domain_digest16;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Version of the record layout.
pub const RECORD_VERSION: &str = "1.0.0";

/// Domain prefix mixed into every transaction hash.
pub const RECORD_HASH_DOMAIN: &[u8] = b"obligo-ledger-record-v1:";

/// Fixed notice carried by every record.
pub const DISCLAIMER: &str = "Structural lexical analysis only. This record attests to what was \
detected and how it was computed; it is not legal advice and makes no determination of \
compliance.";

/// Format of the analysed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    Text,
    Pdf,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Text => f.write_str("text"),
            InputFormat::Pdf => f.write_str("pdf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub hash: String,
    /// Length of the analysed text in chars.
    pub length: usize,
    pub format: InputFormat,
}

impl InputDescriptor {
    pub fn new(hash: impl Into<String>, length: usize, format: InputFormat) -> Self {
        Self {
            hash: hash.into(),
            length,
            format,
        }
    }
}

/// `digest16` of each stage's canonical JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputHashes {
    pub detection_hash: String,
    pub obligation_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    pub engine_version: String,
    pub ruleset_version: String,
    pub os: String,
    pub arch: String,
}

impl EnvironmentDescriptor {
    /// Descriptor for the running build and platform.
    pub fn current(engine_version: impl Into<String>, ruleset_version: impl Into<String>) -> Self {
        Self {
            engine_version: engine_version.into(),
            ruleset_version: ruleset_version.into(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub previous_hash: String,
    pub transaction_hash: String,
}

/// One sealed ledger entry. Field order is the serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub version: String,
    pub transaction_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub input_descriptor: InputDescriptor,
    pub output_hashes: OutputHashes,
    pub environment_descriptor: EnvironmentDescriptor,
    pub chain: ChainLink,
    pub disclaimer: String,
}

/// Everything a transaction hash covers: the record minus its own hash.
#[derive(Serialize)]
struct HashView<'a> {
    version: &'a str,
    transaction_id: &'a Uuid,
    timestamp: &'a DateTime<Utc>,
    input_descriptor: &'a InputDescriptor,
    output_hashes: &'a OutputHashes,
    environment_descriptor: &'a EnvironmentDescriptor,
    previous_hash: &'a str,
    disclaimer: &'a str,
}

impl TransactionRecord {
    /// Recompute the self hash from the record's current contents.
    pub fn compute_hash(&self) -> Result<String> {
        let view = HashView {
            version: &self.version,
            transaction_id: &self.transaction_id,
            timestamp: &self.timestamp,
            input_descriptor: &self.input_descriptor,
            output_hashes: &self.output_hashes,
            environment_descriptor: &self.environment_descriptor,
            previous_hash: &self.chain.previous_hash,
            disclaimer: &self.disclaimer,
        };
        let encoded = serde_json::to_vec(&view)?;
        Ok(domain_digest16(RECORD_HASH_DOMAIN, &encoded))
    }

    pub fn previous_hash(&self) -> &str {
        &self.chain.previous_hash
    }

    pub fn transaction_hash(&self) -> &str {
        &self.chain.transaction_hash
    }
}

/// Build and seal a record chained onto `previous_hash`.
///
/// Assigns a fresh v4 transaction id and the current UTC time.
pub fn seal_record(
    input_descriptor: InputDescriptor,
    output_hashes: OutputHashes,
    environment_descriptor: EnvironmentDescriptor,
    previous_hash: impl Into<String>,
) -> Result<TransactionRecord> {
    let mut record = TransactionRecord {
        version: RECORD_VERSION.to_string(),
        transaction_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        input_descriptor,
        output_hashes,
        environment_descriptor,
        chain: ChainLink {
            previous_hash: previous_hash.into(),
            transaction_hash: String::new(),
        },
        disclaimer: DISCLAIMER.to_string(),
    };
    record.chain.transaction_hash = record.compute_hash()?;
    Ok(record)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn input(n: usize) -> InputDescriptor {
        InputDescriptor::new(format!("{n:016x}"), n * 10, InputFormat::Text)
    }

    pub fn outputs(n: usize) -> OutputHashes {
        OutputHashes {
            detection_hash: format!("{:016x}", n + 1),
            obligation_hash: format!("{:016x}", n + 2),
        }
    }

    pub fn environment() -> EnvironmentDescriptor {
        EnvironmentDescriptor::current("1.0.0", "1.0.0")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use obligo_types::{is_hash16, GENESIS_HASH};

    #[test]
    fn sealed_record_hash_verifies() {
        let record = seal_record(input(1), outputs(1), environment(), GENESIS_HASH).unwrap();
        assert!(is_hash16(record.transaction_hash()));
        assert_eq!(record.compute_hash().unwrap(), record.transaction_hash());
        assert_eq!(record.previous_hash(), GENESIS_HASH);
        assert_eq!(record.disclaimer, DISCLAIMER);
    }

    #[test]
    fn hash_ignores_stored_transaction_hash() {
        let mut record = seal_record(input(1), outputs(1), environment(), GENESIS_HASH).unwrap();
        let expected = record.transaction_hash().to_string();
        record.chain.transaction_hash = "ffffffffffffffff".into();
        assert_eq!(record.compute_hash().unwrap(), expected);
    }

    #[test]
    fn hash_covers_every_other_field() {
        let base = seal_record(input(1), outputs(1), environment(), GENESIS_HASH).unwrap();
        let original = base.compute_hash().unwrap();

        let mut changed = base.clone();
        changed.output_hashes.obligation_hash = "0123456789abcdef".into();
        assert_ne!(changed.compute_hash().unwrap(), original);

        let mut changed = base.clone();
        changed.chain.previous_hash = "0000000000000001".into();
        assert_ne!(changed.compute_hash().unwrap(), original);

        let mut changed = base.clone();
        changed.input_descriptor.format = InputFormat::Pdf;
        assert_ne!(changed.compute_hash().unwrap(), original);

        let mut changed = base;
        changed.disclaimer.push('.');
        assert_ne!(changed.compute_hash().unwrap(), original);
    }

    #[test]
    fn serialized_field_order_is_fixed() {
        let record = seal_record(input(1), outputs(1), environment(), GENESIS_HASH).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let keys = [
            "\"version\"",
            "\"transaction_id\"",
            "\"timestamp\"",
            "\"input_descriptor\"",
            "\"output_hashes\"",
            "\"environment_descriptor\"",
            "\"chain\"",
            "\"disclaimer\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(json.contains("\"format\":\"text\""));
    }

    #[test]
    fn decoded_record_rehashes_identically() {
        let record = seal_record(input(3), outputs(3), environment(), GENESIS_HASH).unwrap();
        let json = serde_json::to_vec_pretty(&record).unwrap();
        let decoded: TransactionRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.compute_hash().unwrap(), record.transaction_hash());
    }
}
