use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use obligo_types::{
    Field, FieldEvidence, ObligationInstance, ObligationResult, ObligationStatus, ObligationType,
    OperatorClass, OperatorMatch, StatusSummary,
};
use tracing::{info, trace};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::extract::extract_evidence;
use crate::vocabulary::ScopeVocabulary;

/// Version of the obligation result format and binding rules.
pub const ENGINE_VERSION: &str = "1.0.0";

/// Obligation type a match of `class` triggers, if any.
pub fn obligation_type_for(class: OperatorClass) -> Option<ObligationType> {
    match class {
        OperatorClass::Req => Some(ObligationType::ReqApplicability),
        OperatorClass::Def => Some(ObligationType::DefConsistency),
        OperatorClass::Cause => Some(ObligationType::CauseSupport),
        OperatorClass::Scope => Some(ObligationType::ScopeBounding),
        OperatorClass::Univ | OperatorClass::Anchor => None,
    }
}

/// Turns an ordered match list into obligation instances.
///
/// Stateless between calls: an engine can be shared across threads and
/// `instantiate` called concurrently.
#[derive(Debug, Clone)]
pub struct ObligationEngine {
    config: EngineConfig,
    vocabulary: ScopeVocabulary,
}

impl ObligationEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            config,
            vocabulary: ScopeVocabulary::v1()?,
        })
    }

    /// Engine with the default (versioned) configuration.
    pub fn v1() -> Result<Self> {
        Self::new(EngineConfig::default())
    }

    /// Process-wide default engine, built on first use.
    pub fn builtin() -> Result<&'static ObligationEngine> {
        static BUILTIN: OnceLock<Result<ObligationEngine>> = OnceLock::new();
        BUILTIN.get_or_init(Self::v1).as_ref().map_err(Clone::clone)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create one obligation per triggering match, in match order.
    ///
    /// `matches` is expected in detector order; ids and "first nearby
    /// evidence wins" both follow it.
    pub fn instantiate(&self, matches: &[OperatorMatch]) -> ObligationResult {
        let direct: Vec<Vec<FieldEvidence>> = matches
            .iter()
            .map(|m| extract_evidence(m, &self.vocabulary))
            .collect();

        let mut counters: BTreeMap<ObligationType, usize> = BTreeMap::new();
        let mut summary = StatusSummary::default();
        let mut obligations = Vec::new();

        for (index, trigger) in matches.iter().enumerate() {
            let Some(obligation_type) = obligation_type_for(trigger.operator_class) else {
                continue;
            };

            let counter = counters.entry(obligation_type).or_insert(0);
            *counter += 1;
            let id = format!("{}_{:03}", obligation_type.as_str(), *counter);

            let evidence = self.bind_evidence(index, matches, &direct);
            let obligation = build_obligation(id, obligation_type, trigger, evidence);
            trace!(
                id = %obligation.id,
                status = %obligation.status,
                missing = obligation.missing_fields.len(),
                "instantiated obligation"
            );
            summary.record(obligation.status);
            obligations.push(obligation);
        }

        info!(
            matches = matches.len(),
            obligations = obligations.len(),
            satisfied = summary.satisfied,
            open = summary.open,
            "obligation instantiation complete"
        );

        ObligationResult {
            version: ENGINE_VERSION.to_string(),
            obligation_count: obligations.len(),
            status_summary: summary,
            obligations,
        }
    }

    /// Direct evidence of the trigger, then evidence of every other match whose
    /// midpoint lies within the window, in match order. First item per field
    /// wins.
    fn bind_evidence(
        &self,
        trigger_index: usize,
        matches: &[OperatorMatch],
        direct: &[Vec<FieldEvidence>],
    ) -> Vec<FieldEvidence> {
        let trigger_mid = matches[trigger_index].span().doubled_midpoint();
        let window = self.config.proximity_window.saturating_mul(2);

        let nearby = matches
            .iter()
            .zip(direct)
            .enumerate()
            .filter(|(j, (other, _))| {
                *j != trigger_index
                    && other.span().doubled_midpoint().abs_diff(trigger_mid) <= window
            })
            .flat_map(|(_, (_, evidence))| evidence.iter());

        let mut seen = BTreeSet::new();
        direct[trigger_index]
            .iter()
            .chain(nearby)
            .filter(|e| seen.insert(e.field))
            .cloned()
            .collect()
    }
}

fn build_obligation(
    id: String,
    obligation_type: ObligationType,
    trigger: &OperatorMatch,
    evidence: Vec<FieldEvidence>,
) -> ObligationInstance {
    let required_fields = obligation_type.required_fields();
    let evidenced: BTreeSet<Field> = evidence.iter().map(|e| e.field).collect();
    let present_fields: BTreeSet<Field> = required_fields.intersection(&evidenced).copied().collect();
    let missing_fields: BTreeSet<Field> = required_fields.difference(&evidenced).copied().collect();

    // CONTRADICTED and AMBIGUOUS are never assigned by this engine version.
    let status = if missing_fields.is_empty() {
        ObligationStatus::Satisfied
    } else {
        ObligationStatus::Open
    };

    ObligationInstance {
        id,
        obligation_type,
        trigger_pattern_id: trigger.pattern_id.clone(),
        trigger_span: trigger.span(),
        required_fields,
        present_fields,
        missing_fields,
        status,
        evidence,
    }
}
