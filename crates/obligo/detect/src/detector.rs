use obligo_types::{change_fingerprint, Captures, DetectionResult, OperatorMatch};
use tracing::{debug, info};

use crate::error::{DetectError, Result};
use crate::matcher::RawMatch;
use crate::pattern::{MatchView, PatternDefinition};
use crate::registry::PatternRegistry;

/// Version of the detection result format.
pub const DETECTOR_VERSION: &str = "1.0.0";

/// Detect every operator in `text`.
///
/// Each pattern is scanned independently over the whole text; spans from
/// different patterns may overlap. The combined list is sorted by
/// `char_start`, ties broken by `pattern_id`, whatever the registry order.
/// Empty input gives an empty list. A rule that fails or yields an
/// ill-formed span fails the whole call.
pub fn detect(text: &str, registry: &PatternRegistry) -> Result<DetectionResult> {
    let index = CharIndex::new(text);
    let mut matches = Vec::new();

    for pattern in registry {
        let found = scan_pattern(pattern, text, &index)?;
        debug!(pattern_id = pattern.id(), matches = found.len(), "scanned pattern");
        matches.extend(found);
    }

    matches.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    let input_hash = change_fingerprint(text);
    info!(
        patterns = registry.len(),
        matches = matches.len(),
        input_hash = %input_hash,
        "detection complete"
    );

    Ok(DetectionResult {
        version: DETECTOR_VERSION.to_string(),
        ruleset_version: registry.version().to_string(),
        pattern_count: registry.len(),
        input_hash,
        matches,
    })
}

/// A detector bound to one registry.
#[derive(Debug, Clone, Copy)]
pub struct Detector<'r> {
    registry: &'r PatternRegistry,
}

impl<'r> Detector<'r> {
    pub fn new(registry: &'r PatternRegistry) -> Self {
        Self { registry }
    }

    /// Detector over the process-wide builtin ruleset.
    pub fn builtin() -> Result<Detector<'static>> {
        Ok(Detector::new(PatternRegistry::builtin()?))
    }

    pub fn registry(&self) -> &'r PatternRegistry {
        self.registry
    }

    pub fn detect(&self, text: &str) -> Result<DetectionResult> {
        detect(text, self.registry)
    }
}

fn scan_pattern(
    pattern: &PatternDefinition,
    text: &str,
    index: &CharIndex,
) -> Result<Vec<OperatorMatch>> {
    let raw = pattern
        .rule()
        .scan(text)
        .map_err(|e| ill_formed(pattern, format!("rule failed: {e}")))?;

    let mut out = Vec::with_capacity(raw.len());
    let mut previous_end = 0usize;
    for m in raw {
        check_span(pattern, text, &m, previous_end)?;
        previous_end = m.end;
        out.push(build_match(pattern, text, index, &m)?);
    }
    Ok(out)
}

fn check_span(
    pattern: &PatternDefinition,
    text: &str,
    m: &RawMatch,
    previous_end: usize,
) -> Result<()> {
    if m.start >= m.end {
        return Err(ill_formed(
            pattern,
            format!("zero-width or inverted match at byte {}", m.start),
        ));
    }
    if m.end > text.len() || !text.is_char_boundary(m.start) || !text.is_char_boundary(m.end) {
        return Err(ill_formed(
            pattern,
            format!("match {}..{} is outside the text or splits a character", m.start, m.end),
        ));
    }
    if m.start < previous_end {
        return Err(ill_formed(
            pattern,
            format!("match at byte {} overlaps or precedes the previous match", m.start),
        ));
    }
    if m.groups.len() != pattern.capture_names().len() {
        return Err(ill_formed(
            pattern,
            format!(
                "rule reported {} groups, {} capture names declared",
                m.groups.len(),
                pattern.capture_names().len()
            ),
        ));
    }
    Ok(())
}

fn build_match(
    pattern: &PatternDefinition,
    text: &str,
    index: &CharIndex,
    m: &RawMatch,
) -> Result<OperatorMatch> {
    let mut captures = Captures::new();
    for (name, group) in pattern.capture_names().iter().zip(&m.groups) {
        let Some((start, end)) = *group else {
            continue;
        };
        let value = text
            .get(start..end)
            .ok_or_else(|| ill_formed(pattern, format!("capture {name} has invalid span {start}..{end}")))?;
        captures.insert(name.clone(), value.to_string());
    }

    let matched_text = &text[m.start..m.end];
    let metadata = pattern.metadata(&MatchView {
        matched_text,
        captures: &captures,
    });

    Ok(OperatorMatch {
        operator_class: pattern.operator_class(),
        pattern_id: pattern.id().to_string(),
        char_start: index.char_offset(m.start),
        char_end: index.char_offset(m.end),
        matched_text: matched_text.to_string(),
        captures,
        metadata,
    })
}

fn ill_formed(pattern: &PatternDefinition, reason: String) -> DetectError {
    DetectError::IllFormedPattern {
        pattern_id: pattern.id().to_string(),
        reason,
    }
}

/// Byte offset to char offset conversion for one text.
enum CharIndex {
    /// ASCII text: byte and char offsets coincide.
    Ascii,
    /// Byte offset of every char start, in order.
    Boundaries(Vec<usize>),
}

impl CharIndex {
    fn new(text: &str) -> Self {
        if text.is_ascii() {
            CharIndex::Ascii
        } else {
            CharIndex::Boundaries(text.char_indices().map(|(b, _)| b).collect())
        }
    }

    /// Char offset of a byte offset already known to be a char boundary.
    fn char_offset(&self, byte: usize) -> usize {
        match self {
            CharIndex::Ascii => byte,
            // A boundary equal to the text length lands one past the last
            // char start, which is exactly the char count.
            CharIndex::Boundaries(starts) => starts.partition_point(|&b| b < byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatcherError;
    use crate::matcher::LexicalMatcher;
    use obligo_types::OperatorClass;
    use std::sync::Arc;

    fn registry(patterns: Vec<PatternDefinition>) -> PatternRegistry {
        PatternRegistry::new("test", patterns).unwrap()
    }

    struct FailingMatcher;

    impl LexicalMatcher for FailingMatcher {
        fn capture_count(&self) -> usize {
            0
        }

        fn scan(&self, _text: &str) -> std::result::Result<Vec<RawMatch>, MatcherError> {
            Err(MatcherError("backtrack limit exceeded".into()))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    struct OverlappingMatcher;

    impl LexicalMatcher for OverlappingMatcher {
        fn capture_count(&self) -> usize {
            0
        }

        fn scan(&self, _text: &str) -> std::result::Result<Vec<RawMatch>, MatcherError> {
            Ok(vec![
                RawMatch { start: 0, end: 4, groups: vec![] },
                RawMatch { start: 2, end: 6, groups: vec![] },
            ])
        }

        fn describe(&self) -> String {
            "overlapping".into()
        }
    }

    #[test]
    fn empty_text_yields_empty_matches() {
        let reg = PatternRegistry::v1().unwrap();
        let result = detect("", &reg).unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(result.pattern_count, reg.len());
        assert_eq!(result.input_hash, change_fingerprint(""));
    }

    #[test]
    fn output_order_ignores_registry_order() {
        let a = PatternDefinition::regex("b.second", OperatorClass::Req, r"must", &[]).unwrap();
        let b = PatternDefinition::regex("a.first", OperatorClass::Univ, r"must", &[]).unwrap();
        let forward = detect("must", &registry(vec![a.clone(), b.clone()])).unwrap();
        let backward = detect("must", &registry(vec![b, a])).unwrap();
        assert_eq!(forward.matches, backward.matches);
        assert_eq!(forward.matches[0].pattern_id, "a.first");
        assert_eq!(forward.matches[1].pattern_id, "b.second");
    }

    #[test]
    fn offsets_are_in_chars_not_bytes() {
        let p = PatternDefinition::regex("req.must", OperatorClass::Req, r"must", &[]).unwrap();
        let result = detect("Ünïcödé must", &registry(vec![p])).unwrap();
        let m = &result.matches[0];
        assert_eq!((m.char_start, m.char_end), (8, 12));
        assert_eq!(m.matched_text, "must");
    }

    #[test]
    fn captures_map_by_position_and_skip_absent_groups() {
        let p = PatternDefinition::regex(
            "req.must",
            OperatorClass::Req,
            r"(must)(\s+not)?",
            &["modal", "negation"],
        )
        .unwrap();
        let result = detect("must", &registry(vec![p])).unwrap();
        let m = &result.matches[0];
        assert_eq!(m.capture("modal"), Some("must"));
        assert_eq!(m.capture("negation"), None);
    }

    #[test]
    fn failing_rule_fails_the_whole_call() {
        let good = PatternDefinition::regex("req.must", OperatorClass::Req, r"must", &[]).unwrap();
        let bad = PatternDefinition::new("anchor.bad", OperatorClass::Anchor, Arc::new(FailingMatcher), vec![])
            .unwrap();
        let err = detect("must", &registry(vec![good, bad])).unwrap_err();
        assert!(matches!(err, DetectError::IllFormedPattern { pattern_id, .. } if pattern_id == "anchor.bad"));
    }

    #[test]
    fn zero_width_matches_are_ill_formed() {
        let p = PatternDefinition::regex("univ.empty", OperatorClass::Univ, r"x*", &[]).unwrap();
        let err = detect("abc", &registry(vec![p])).unwrap_err();
        assert!(matches!(err, DetectError::IllFormedPattern { .. }));
    }

    #[test]
    fn overlapping_output_from_one_rule_is_ill_formed() {
        let p = PatternDefinition::new("scope.overlap", OperatorClass::Scope, Arc::new(OverlappingMatcher), vec![])
            .unwrap();
        let err = detect("abcdefgh", &registry(vec![p])).unwrap_err();
        assert!(matches!(err, DetectError::IllFormedPattern { reason, .. } if reason.contains("overlaps")));
    }

    #[test]
    fn patterns_may_overlap_each_other() {
        let reg = PatternRegistry::v1().unwrap();
        let result = detect("\"Data\" shall mean any information.", &reg).unwrap();
        let ids: Vec<_> = result.matches.iter().map(|m| m.pattern_id.as_str()).collect();
        assert!(ids.contains(&"def.quoted_means"));
        assert!(ids.contains(&"req.must"));
    }

    #[test]
    fn char_index_maps_text_end() {
        let index = CharIndex::new("aé");
        assert_eq!(index.char_offset(0), 0);
        assert_eq!(index.char_offset(1), 1);
        assert_eq!(index.char_offset(3), 2);
    }
}
