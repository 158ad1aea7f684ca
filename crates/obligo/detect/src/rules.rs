//! The versioned builtin rule table.
//!
//! Pattern ids are stable across ruleset versions: a rule whose behaviour
//! changes gets a new id, it is never edited in place under the same version.

use obligo_types::{MatchMetadata, OperatorClass};
use serde_json::json;

use crate::pattern::{MatchView, MetadataRule};

/// Version of the builtin rule table.
pub const RULESET_VERSION: &str = "1.0.0";

/// Constant description of one builtin pattern.
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub id: &'static str,
    pub operator_class: OperatorClass,
    pub regex: &'static str,
    pub capture_names: &'static [&'static str],
    pub metadata: Option<MetadataRule>,
}

const fn spec(
    id: &'static str,
    operator_class: OperatorClass,
    regex: &'static str,
    capture_names: &'static [&'static str],
    metadata: Option<MetadataRule>,
) -> PatternSpec {
    PatternSpec {
        id,
        operator_class,
        regex,
        capture_names,
        metadata,
    }
}

/// Builtin patterns, ruleset 1.0.0, in registry order.
pub const V1_PATTERNS: &[PatternSpec] = &[
    // REQ: deontic modals. Intensifiers ("critical", "essential") are
    // deliberately absent.
    spec(
        "req.must",
        OperatorClass::Req,
        r"(?i)\b(must|shall)(\s+not)?\b",
        &["modal", "negation"],
        Some(strong_requirement),
    ),
    spec(
        "req.should",
        OperatorClass::Req,
        r"(?i)\b(should|ought\s+to)(\s+not)?\b",
        &["modal", "negation"],
        Some(weak_requirement),
    ),
    spec(
        "req.required_to",
        OperatorClass::Req,
        r"(?i)\b(is|are|be)\s+(required|obliged|obligated)\s+to\b",
        &["copula", "modal"],
        Some(strong_requirement),
    ),
    spec(
        "req.prohibited",
        OperatorClass::Req,
        r"(?i)\b(?:is|are|be)\s+(prohibited|forbidden)\s+from\b",
        &["modal"],
        Some(prohibition),
    ),
    spec(
        "req.may_not",
        OperatorClass::Req,
        r"(?i)\bmay\s+not\b",
        &[],
        Some(prohibition),
    ),
    // DEF
    spec(
        "def.quoted_means",
        OperatorClass::Def,
        r#"["“]([^"”\n]{1,80})["”]\s+(means|shall\s+mean|refers\s+to|is\s+defined\s+as)\b"#,
        &["term", "verb"],
        None,
    ),
    spec(
        "def.capitalised_means",
        OperatorClass::Def,
        r"\b([A-Z][A-Za-z\-]*(?:\s+[A-Z][A-Za-z\-]*){0,3})\s+(means|refers\s+to|is\s+defined\s+as)\b",
        &["term", "verb"],
        None,
    ),
    spec(
        "def.hereinafter",
        OperatorClass::Def,
        r#"(?i)\((?:hereinafter\s+|hereafter\s+)?(?:referred\s+to\s+as\s+)?(?:the\s+)?["“]([^"”\n]{1,80})["”]\)"#,
        &["term"],
        None,
    ),
    spec(
        "def.purposes_of",
        OperatorClass::Def,
        r"(?i)\bfor\s+the\s+purposes?\s+of\s+this\s+(section|article|chapter|part|agreement|regulation|policy|act)\b",
        &["unit"],
        None,
    ),
    // CAUSE
    spec(
        "cause.because",
        OperatorClass::Cause,
        r"(?i)\b(because(?:\s+of)?|due\s+to|owing\s+to|as\s+a\s+result\s+of|on\s+account\s+of)\b",
        &["connector"],
        None,
    ),
    spec(
        "cause.therefore",
        OperatorClass::Cause,
        r"(?i)\b(therefore|consequently|accordingly|hence|thus)\b",
        &["connector"],
        None,
    ),
    spec(
        "cause.purpose",
        OperatorClass::Cause,
        r"(?i)\b(in\s+order\s+to|so\s+that|with\s+a\s+view\s+to)\b",
        &["connector"],
        None,
    ),
    // SCOPE
    spec(
        "scope.applies_to",
        OperatorClass::Scope,
        r"(?i)\b(?:applies|apply|applicable)\s+(?:only\s+)?to\s+([^.;:\n]{1,120})",
        &["target"],
        None,
    ),
    spec(
        "scope.within",
        OperatorClass::Scope,
        r"(?i)\bwithin\s+([^.;:,\n]{1,80})",
        &["extent"],
        None,
    ),
    spec(
        "scope.exception",
        OperatorClass::Scope,
        r"(?i)\b(unless|except(?:\s+(?:where|when|as|for|that))?)\s+([^.;\n]{1,120})",
        &["connector", "condition"],
        None,
    ),
    spec(
        "scope.temporal",
        OperatorClass::Scope,
        r"(?i)\b(no\s+later\s+than|not\s+later\s+than|prior\s+to|until|before|after)\s+([^.;,\n]{1,60})",
        &["connector", "bound"],
        None,
    ),
    spec(
        "scope.jurisdiction",
        OperatorClass::Scope,
        r"(?i)\b(?:in|throughout|across|under\s+the\s+laws\s+of)\s+(the\s+European\s+Union|the\s+European\s+Economic\s+Area|the\s+United\s+States|the\s+United\s+Kingdom|the\s+EU|the\s+EEA|the\s+UK|the\s+US|any\s+Member\s+State|the\s+Member\s+States?|California|Canada|England\s+and\s+Wales)\b",
        &["jurisdiction"],
        None,
    ),
    spec(
        "scope.actor",
        OperatorClass::Scope,
        r"(?i)\b(?:for|by|to)\s+(all\s+|any\s+)?(users?|customers?|employees?|members?|subscribers?|applicants?|controllers?|processors?|data\s+subjects?|providers?|operators?|contractors?|vendors?|licensees?)\b",
        &["quantifier", "actor"],
        None,
    ),
    // UNIV
    spec(
        "univ.quantifier",
        OperatorClass::Univ,
        r"(?i)\b(all|every|each|any)\s+([a-z][a-z\-]*)",
        &["quantifier", "noun"],
        Some(quantifier_polarity),
    ),
    spec(
        "univ.absolute",
        OperatorClass::Univ,
        r"(?i)\b(always|never|at\s+all\s+times|without\s+exception|in\s+no\s+event|under\s+no\s+circumstances)\b",
        &["quantifier"],
        Some(quantifier_polarity),
    ),
    // ANCHOR
    spec(
        "anchor.section_ref",
        OperatorClass::Anchor,
        r"(?i)\b(section|article|clause|paragraph|annex|appendix|schedule|chapter)\s+(\d+[a-z]?(?:\.\d+)*(?:\([a-z0-9]+\))*)",
        &["kind", "number"],
        None,
    ),
    spec(
        "anchor.section_sign",
        OperatorClass::Anchor,
        r"(§{1,2})\s*(\d+[a-z]?(?:\.\d+)*)",
        &["sign", "number"],
        None,
    ),
    spec(
        "anchor.eu_instrument",
        OperatorClass::Anchor,
        r"\b(Regulation|Directive|Decision)\s+\((EU|EC|EEC|Euratom)\)\s+(?:No\s+)?(\d{2,4}/\d{1,4})",
        &["instrument", "body", "number"],
        None,
    ),
    spec(
        "anchor.url",
        OperatorClass::Anchor,
        r#"\bhttps?://[^\s<>()\[\]"]*[^\s<>()\[\]".,;:!?]"#,
        &[],
        None,
    ),
    spec(
        "anchor.pursuant",
        OperatorClass::Anchor,
        r"(?i)\b(pursuant\s+to|in\s+accordance\s+with|as\s+defined\s+in|as\s+set\s+out\s+in|as\s+referred\s+to\s+in|subject\s+to)\b",
        &["connector"],
        None,
    ),
];

fn requirement(strength: &str, negated: bool) -> MatchMetadata {
    MatchMetadata::from([
        ("negated".to_string(), json!(negated)),
        ("strength".to_string(), json!(strength)),
    ])
}

fn strong_requirement(view: &MatchView<'_>) -> MatchMetadata {
    requirement("strong", view.captures.contains_key("negation"))
}

fn weak_requirement(view: &MatchView<'_>) -> MatchMetadata {
    requirement("weak", view.captures.contains_key("negation"))
}

fn prohibition(_view: &MatchView<'_>) -> MatchMetadata {
    requirement("strong", true)
}

fn quantifier_polarity(view: &MatchView<'_>) -> MatchMetadata {
    let quantifier = view
        .captures
        .get("quantifier")
        .map(|q| q.to_ascii_lowercase())
        .unwrap_or_default();
    let negative = quantifier == "never"
        || quantifier.starts_with("in no")
        || quantifier.starts_with("under no");
    let polarity = if negative { "negative" } else { "positive" };
    MatchMetadata::from([("polarity".to_string(), json!(polarity))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use obligo_types::Captures;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_namespaced_by_class() {
        let mut seen = HashSet::new();
        for spec in V1_PATTERNS {
            assert!(seen.insert(spec.id), "duplicate id {}", spec.id);
            let prefix = spec.operator_class.as_str().to_ascii_lowercase();
            assert!(spec.id.starts_with(&format!("{prefix}.")), "{}", spec.id);
        }
    }

    #[test]
    fn every_class_has_at_least_one_rule() {
        for class in OperatorClass::ALL {
            assert!(V1_PATTERNS.iter().any(|s| s.operator_class == class), "{class}");
        }
    }

    #[test]
    fn negated_modal_sets_metadata() {
        let mut captures = Captures::new();
        captures.insert("modal".into(), "must".into());
        captures.insert("negation".into(), " not".into());
        let meta = strong_requirement(&MatchView {
            matched_text: "must not",
            captures: &captures,
        });
        assert_eq!(meta.get("negated"), Some(&json!(true)));
        assert_eq!(meta.get("strength"), Some(&json!("strong")));
    }

    #[test]
    fn never_is_negative_polarity() {
        let mut captures = Captures::new();
        captures.insert("quantifier".into(), "Never".into());
        let meta = quantifier_polarity(&MatchView {
            matched_text: "Never",
            captures: &captures,
        });
        assert_eq!(meta.get("polarity"), Some(&json!("negative")));
    }
}
