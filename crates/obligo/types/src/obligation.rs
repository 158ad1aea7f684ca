use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagParseError;
use crate::operator::Span;

/// The six tracked evidence slots (what, who, where, when, why, scope).
///
/// Declaration order is the canonical order used in every serialized set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    What,
    Who,
    Where,
    When,
    Why,
    Scope,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::What,
        Field::Who,
        Field::Where,
        Field::When,
        Field::Why,
        Field::Scope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::What => "what",
            Field::Who => "who",
            Field::Where => "where",
            Field::When => "when",
            Field::Why => "why",
            Field::Scope => "scope",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TagParseError::new("field", s))
    }
}

/// Obligation kinds, one per triggering operator class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObligationType {
    ReqApplicability,
    DefConsistency,
    CauseSupport,
    ScopeBounding,
}

impl ObligationType {
    pub const ALL: [ObligationType; 4] = [
        ObligationType::ReqApplicability,
        ObligationType::DefConsistency,
        ObligationType::CauseSupport,
        ObligationType::ScopeBounding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationType::ReqApplicability => "REQ_APPLICABILITY",
            ObligationType::DefConsistency => "DEF_CONSISTENCY",
            ObligationType::CauseSupport => "CAUSE_SUPPORT",
            ObligationType::ScopeBounding => "SCOPE_BOUNDING",
        }
    }

    /// Fields that must all carry evidence for the obligation to be satisfied.
    pub fn required_fields(&self) -> BTreeSet<Field> {
        let fields: &[Field] = match self {
            ObligationType::ReqApplicability => &[Field::What, Field::Who],
            ObligationType::DefConsistency => &[Field::What],
            ObligationType::CauseSupport => &[Field::Why],
            ObligationType::ScopeBounding => &[Field::Scope],
        };
        fields.iter().copied().collect()
    }
}

impl fmt::Display for ObligationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObligationType {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObligationType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TagParseError::new("obligation type", s))
    }
}

/// Obligation status.
///
/// `Contradicted` and `Ambiguous` are declared so the wire format is stable,
/// but the current engine never assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObligationStatus {
    Satisfied,
    Open,
    Contradicted,
    Ambiguous,
}

impl ObligationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationStatus::Satisfied => "SATISFIED",
            ObligationStatus::Open => "OPEN",
            ObligationStatus::Contradicted => "CONTRADICTED",
            ObligationStatus::Ambiguous => "AMBIGUOUS",
        }
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence for one field, taken from exactly one operator match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEvidence {
    pub field: Field,
    pub source_pattern_id: String,
    pub char_start: usize,
    pub char_end: usize,
    pub value: String,
}

/// A structural record created from one triggering match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationInstance {
    pub id: String,
    pub obligation_type: ObligationType,
    pub trigger_pattern_id: String,
    pub trigger_span: Span,
    pub required_fields: BTreeSet<Field>,
    pub present_fields: BTreeSet<Field>,
    pub missing_fields: BTreeSet<Field>,
    pub status: ObligationStatus,
    pub evidence: Vec<FieldEvidence>,
}

impl ObligationInstance {
    /// `present ∪ missing == required` and `present ∩ missing == ∅`.
    pub fn fields_partition_required(&self) -> bool {
        let union: BTreeSet<Field> = self
            .present_fields
            .union(&self.missing_fields)
            .copied()
            .collect();
        union == self.required_fields && self.present_fields.is_disjoint(&self.missing_fields)
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == ObligationStatus::Satisfied
    }

    pub fn evidence_for(&self, field: Field) -> Option<&FieldEvidence> {
        self.evidence.iter().find(|e| e.field == field)
    }
}

/// Obligation counts per status, serialized in fixed key order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    #[serde(rename = "SATISFIED")]
    pub satisfied: usize,
    #[serde(rename = "OPEN")]
    pub open: usize,
    #[serde(rename = "CONTRADICTED")]
    pub contradicted: usize,
    #[serde(rename = "AMBIGUOUS")]
    pub ambiguous: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: ObligationStatus) {
        match status {
            ObligationStatus::Satisfied => self.satisfied += 1,
            ObligationStatus::Open => self.open += 1,
            ObligationStatus::Contradicted => self.contradicted += 1,
            ObligationStatus::Ambiguous => self.ambiguous += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.satisfied + self.open + self.contradicted + self.ambiguous
    }
}
