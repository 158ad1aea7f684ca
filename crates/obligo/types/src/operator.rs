use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TagParseError;

/// Capture values of a match, keyed by declared capture name.
pub type Captures = BTreeMap<String, String>;

/// Small metadata record derived from a raw match (e.g. `strength`, `negated`).
pub type MatchMetadata = BTreeMap<String, serde_json::Value>;

/// The six lexical operator classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatorClass {
    /// Requirement (deontic modal).
    Req,
    /// Definition of a term.
    Def,
    /// Causal or justification link.
    Cause,
    /// Scope restriction.
    Scope,
    /// Universal quantifier.
    Univ,
    /// External reference.
    Anchor,
}

impl OperatorClass {
    pub const ALL: [OperatorClass; 6] = [
        OperatorClass::Req,
        OperatorClass::Def,
        OperatorClass::Cause,
        OperatorClass::Scope,
        OperatorClass::Univ,
        OperatorClass::Anchor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorClass::Req => "REQ",
            OperatorClass::Def => "DEF",
            OperatorClass::Cause => "CAUSE",
            OperatorClass::Scope => "SCOPE",
            OperatorClass::Univ => "UNIV",
            OperatorClass::Anchor => "ANCHOR",
        }
    }
}

impl fmt::Display for OperatorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorClass {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorClass::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TagParseError::new("operator class", s))
    }
}

/// Half-open character span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Twice the midpoint, so midpoints stay integral.
    pub fn doubled_midpoint(&self) -> usize {
        self.start + self.end
    }
}

/// One occurrence of a pattern in the input.
///
/// Offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMatch {
    pub operator_class: OperatorClass,
    pub pattern_id: String,
    pub char_start: usize,
    pub char_end: usize,
    pub matched_text: String,
    #[serde(default)]
    pub captures: Captures,
    #[serde(default)]
    pub metadata: MatchMetadata,
}

impl OperatorMatch {
    pub fn span(&self) -> Span {
        Span::new(self.char_start, self.char_end)
    }

    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    /// Ordering key of the global match order: `char_start`, then `pattern_id`.
    pub fn order_key(&self) -> (usize, &str) {
        (self.char_start, self.pattern_id.as_str())
    }
}
