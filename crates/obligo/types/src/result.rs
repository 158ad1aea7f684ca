use serde::{Deserialize, Serialize};

use crate::hash::digest16_json;
use crate::obligation::{ObligationInstance, StatusSummary};
use crate::operator::{OperatorClass, OperatorMatch};

/// Output of one detector run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub version: String,
    pub ruleset_version: String,
    pub pattern_count: usize,
    pub input_hash: String,
    pub matches: Vec<OperatorMatch>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn count_class(&self, class: OperatorClass) -> usize {
        self.matches
            .iter()
            .filter(|m| m.operator_class == class)
            .count()
    }

    /// True if matches are sorted by `char_start`, ties by `pattern_id`.
    pub fn is_canonically_ordered(&self) -> bool {
        self.matches
            .windows(2)
            .all(|pair| pair[0].order_key() <= pair[1].order_key())
    }

    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// `digest16` of the canonical JSON, as recorded in ledger output hashes.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        digest16_json(self)
    }
}

/// Output of one obligation-engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationResult {
    pub version: String,
    pub obligation_count: usize,
    pub status_summary: StatusSummary,
    pub obligations: Vec<ObligationInstance>,
}

impl ObligationResult {
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn digest(&self) -> Result<String, serde_json::Error> {
        digest16_json(self)
    }
}
