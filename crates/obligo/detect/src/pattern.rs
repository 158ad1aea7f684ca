use std::fmt;
use std::sync::Arc;

use obligo_types::{Captures, MatchMetadata, OperatorClass};

use crate::error::{DetectError, Result};
use crate::matcher::{LexicalMatcher, RegexMatcher};

/// What a metadata rule sees of a raw match.
#[derive(Debug, Clone, Copy)]
pub struct MatchView<'a> {
    pub matched_text: &'a str,
    pub captures: &'a Captures,
}

/// Pure function deriving a metadata record from a match.
pub type MetadataRule = fn(&MatchView<'_>) -> MatchMetadata;

/// An immutable pattern: id, operator class, lexical rule, capture names and
/// an optional metadata rule.
///
/// Construction checks that the declared capture names line up with the
/// rule's capture groups, so a definition that exists is well-formed.
#[derive(Clone)]
pub struct PatternDefinition {
    id: String,
    operator_class: OperatorClass,
    rule: Arc<dyn LexicalMatcher>,
    capture_names: Vec<String>,
    metadata_rule: Option<MetadataRule>,
}

impl PatternDefinition {
    pub fn new(
        id: impl Into<String>,
        operator_class: OperatorClass,
        rule: Arc<dyn LexicalMatcher>,
        capture_names: Vec<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DetectError::InvalidRule {
                pattern_id: id,
                reason: "pattern id must not be empty".into(),
            });
        }

        let actual = rule.capture_count();
        if capture_names.len() != actual {
            return Err(DetectError::CaptureCountMismatch {
                pattern_id: id,
                declared: capture_names.len(),
                actual,
            });
        }

        Ok(Self {
            id,
            operator_class,
            rule,
            capture_names,
            metadata_rule: None,
        })
    }

    /// Compile a regex-backed pattern.
    pub fn regex(
        id: impl Into<String>,
        operator_class: OperatorClass,
        pattern: &str,
        capture_names: &[&str],
    ) -> Result<Self> {
        let id = id.into();
        let matcher = RegexMatcher::new(pattern).map_err(|e| DetectError::InvalidRule {
            pattern_id: id.clone(),
            reason: e.to_string(),
        })?;
        Self::new(
            id,
            operator_class,
            Arc::new(matcher),
            capture_names.iter().map(|n| n.to_string()).collect(),
        )
    }

    pub fn with_metadata(mut self, rule: MetadataRule) -> Self {
        self.metadata_rule = Some(rule);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operator_class(&self) -> OperatorClass {
        self.operator_class
    }

    pub fn rule(&self) -> &dyn LexicalMatcher {
        self.rule.as_ref()
    }

    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    pub fn metadata(&self, view: &MatchView<'_>) -> MatchMetadata {
        self.metadata_rule
            .map(|rule| rule(view))
            .unwrap_or_default()
    }
}

impl fmt::Debug for PatternDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternDefinition")
            .field("id", &self.id)
            .field("operator_class", &self.operator_class)
            .field("rule", &self.rule.describe())
            .field("capture_names", &self.capture_names)
            .field("has_metadata_rule", &self.metadata_rule.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn negation_flag(view: &MatchView<'_>) -> MatchMetadata {
        MatchMetadata::from([(
            "negated".to_string(),
            json!(view.captures.contains_key("negation")),
        )])
    }

    #[test]
    fn capture_names_must_match_group_count() {
        let err = PatternDefinition::regex("req.x", OperatorClass::Req, r"(must)(\s+not)?", &["modal"])
            .unwrap_err();
        assert_eq!(
            err,
            DetectError::CaptureCountMismatch {
                pattern_id: "req.x".into(),
                declared: 1,
                actual: 2,
            }
        );
    }

    #[test]
    fn invalid_regex_is_a_structural_error() {
        let err = PatternDefinition::regex("bad", OperatorClass::Def, r"(unclosed", &[]).unwrap_err();
        assert!(matches!(err, DetectError::InvalidRule { pattern_id, .. } if pattern_id == "bad"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = PatternDefinition::regex("  ", OperatorClass::Def, r"means", &[]).unwrap_err();
        assert!(matches!(err, DetectError::InvalidRule { .. }));
    }

    #[test]
    fn metadata_rule_is_applied_when_present() {
        let pattern = PatternDefinition::regex("req.x", OperatorClass::Req, r"(must)(\s+not)?", &["modal", "negation"])
            .unwrap()
            .with_metadata(negation_flag);
        let mut captures = Captures::new();
        captures.insert("negation".into(), " not".into());
        let view = MatchView {
            matched_text: "must not",
            captures: &captures,
        };
        assert_eq!(pattern.metadata(&view).get("negated"), Some(&json!(true)));
    }

    #[test]
    fn missing_metadata_rule_yields_empty_record() {
        let pattern = PatternDefinition::regex("anchor.x", OperatorClass::Anchor, r"§", &[]).unwrap();
        let captures = Captures::new();
        let view = MatchView {
            matched_text: "§",
            captures: &captures,
        };
        assert!(pattern.metadata(&view).is_empty());
    }
}
