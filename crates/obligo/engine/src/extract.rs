//! Per-match field extraction.
//!
//! Each operator class has one extraction function that looks only at the
//! match it is given. Dispatch is an exhaustive `match`, so a new operator
//! class cannot compile until it is handled here.

use obligo_types::{Field, FieldEvidence, OperatorClass, OperatorMatch};

use crate::vocabulary::ScopeVocabulary;

/// Direct evidence one match testifies to.
pub fn extract_evidence(m: &OperatorMatch, vocabulary: &ScopeVocabulary) -> Vec<FieldEvidence> {
    match m.operator_class {
        OperatorClass::Def => definition_evidence(m),
        OperatorClass::Cause => causal_evidence(m),
        OperatorClass::Scope => scope_evidence(m, vocabulary),
        OperatorClass::Req | OperatorClass::Univ | OperatorClass::Anchor => Vec::new(),
    }
}

/// DEF: `what`, from the captured term when there is one.
fn definition_evidence(m: &OperatorMatch) -> Vec<FieldEvidence> {
    m.capture("term")
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| vec![evidence(m, Field::What, term)])
        .unwrap_or_default()
}

/// CAUSE: the match itself shows a justification link exists.
fn causal_evidence(m: &OperatorMatch) -> Vec<FieldEvidence> {
    vec![evidence(m, Field::Why, &m.matched_text)]
}

/// SCOPE: always `scope`, plus whatever the closed vocabularies recognise.
fn scope_evidence(m: &OperatorMatch, vocabulary: &ScopeVocabulary) -> Vec<FieldEvidence> {
    let mut out = vec![evidence(m, Field::Scope, &m.matched_text)];
    out.extend(
        vocabulary
            .infer(&m.matched_text)
            .into_iter()
            .map(|(field, value)| evidence(m, field, &value)),
    );
    out
}

fn evidence(m: &OperatorMatch, field: Field, value: &str) -> FieldEvidence {
    FieldEvidence {
        field,
        source_pattern_id: m.pattern_id.clone(),
        char_start: m.char_start,
        char_end: m.char_end,
        value: value.to_string(),
    }
}
