//! Closed SCOPE sub-pattern vocabularies.
//!
//! These are fixed sub-expressions evaluated against a SCOPE match's text to
//! decide whether it also testifies to `who`, `where` or `when`. They are not
//! operators and never produce matches of their own. The lists are versioned
//! with the engine; extending one is an engine version bump.

use obligo_types::Field;
use regex::Regex;

use crate::error::{EngineError, Result};

/// Version of the builtin vocabularies.
pub const VOCABULARY_VERSION: &str = "1.0.0";

const ACTOR_V1: &str = r"(?i)\b(users?|customers?|clients?|employees?|staff|members?|subscribers?|applicants?|controllers?|processors?|data\s+subjects?|individuals?|persons?|providers?|operators?|contractors?|vendors?|licensees?|residents?|citizens?|minors?|children|visitors?)\b";

const JURISDICTION_V1: &str = r"(?i)\b(european\s+union|european\s+economic\s+area|united\s+states|united\s+kingdom|eu|eea|uk|member\s+states?|california|canada|england\s+and\s+wales|jurisdictions?|countr(?:y|ies)|territor(?:y|ies)|premises)\b";

const BOUNDED_TIME_V1: &str = r"(?i)\b(?:\d+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fourteen|fifteen|twenty|thirty|forty-five|sixty|ninety)\s+(?:business\s+|calendar\s+|working\s+)?(?:hours?|days?|weeks?|months?|years?)\b|\b(?:annually|quarterly|monthly|weekly|daily)\b|\b(?:19|20)\d{2}\b";

/// Compiled who/where/when sub-patterns.
#[derive(Debug, Clone)]
pub struct ScopeVocabulary {
    actor: Regex,
    jurisdiction: Regex,
    bounded_time: Regex,
}

impl ScopeVocabulary {
    pub fn v1() -> Result<Self> {
        Ok(Self {
            actor: compile(Field::Who, ACTOR_V1)?,
            jurisdiction: compile(Field::Where, JURISDICTION_V1)?,
            bounded_time: compile(Field::When, BOUNDED_TIME_V1)?,
        })
    }

    /// Fields a scope phrase testifies to beyond `scope`, in `who`, `where`,
    /// `when` order, each with the first sub-pattern hit as its value.
    pub fn infer(&self, phrase: &str) -> Vec<(Field, String)> {
        [
            (Field::Who, &self.actor),
            (Field::Where, &self.jurisdiction),
            (Field::When, &self.bounded_time),
        ]
        .into_iter()
        .filter_map(|(field, regex)| regex.find(phrase).map(|hit| (field, hit.as_str().to_string())))
        .collect()
    }
}

fn compile(field: Field, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| EngineError::InvalidVocabulary {
        field,
        reason: e.to_string(),
    })
}
