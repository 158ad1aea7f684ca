use std::collections::HashSet;
use std::sync::OnceLock;

use obligo_types::OperatorClass;
use tracing::debug;

use crate::error::{DetectError, Result};
use crate::pattern::PatternDefinition;
use crate::rules::{PatternSpec, RULESET_VERSION, V1_PATTERNS};

/// Immutable, versioned, ordered list of pattern definitions.
///
/// Registry order only decides scan order; the detector's output order is
/// independent of it.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    version: String,
    patterns: Vec<PatternDefinition>,
}

impl PatternRegistry {
    /// Build a registry, rejecting duplicate pattern ids.
    pub fn new(version: impl Into<String>, patterns: Vec<PatternDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for pattern in &patterns {
            if !seen.insert(pattern.id()) {
                return Err(DetectError::DuplicatePatternId(pattern.id().to_string()));
            }
        }
        Ok(Self {
            version: version.into(),
            patterns,
        })
    }

    /// Compile a registry from a constant rule table.
    pub fn from_specs(version: impl Into<String>, specs: &[PatternSpec]) -> Result<Self> {
        let patterns = specs
            .iter()
            .map(|spec| {
                let pattern = PatternDefinition::regex(
                    spec.id,
                    spec.operator_class,
                    spec.regex,
                    spec.capture_names,
                )?;
                Ok(match spec.metadata {
                    Some(rule) => pattern.with_metadata(rule),
                    None => pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(version, patterns)
    }

    /// Compile the builtin ruleset.
    pub fn v1() -> Result<Self> {
        let registry = Self::from_specs(RULESET_VERSION, V1_PATTERNS)?;
        debug!(
            version = %registry.version,
            patterns = registry.len(),
            "compiled builtin pattern registry"
        );
        Ok(registry)
    }

    /// Process-wide builtin registry, compiled on first use.
    pub fn builtin() -> Result<&'static PatternRegistry> {
        static BUILTIN: OnceLock<Result<PatternRegistry>> = OnceLock::new();
        BUILTIN.get_or_init(Self::v1).as_ref().map_err(Clone::clone)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternDefinition> {
        self.patterns.iter()
    }

    pub fn get(&self, id: &str) -> Option<&PatternDefinition> {
        self.patterns.iter().find(|p| p.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.patterns.iter().map(PatternDefinition::id).collect()
    }

    /// Alternate registry keeping only the patterns `keep` accepts.
    ///
    /// The derived version is tagged so results produced with a filtered
    /// registry can never be mistaken for builtin-ruleset output.
    pub fn filtered(&self, keep: impl Fn(&PatternDefinition) -> bool) -> PatternRegistry {
        PatternRegistry {
            version: format!("{}+filtered", self.version),
            patterns: self.patterns.iter().filter(|p| keep(p)).cloned().collect(),
        }
    }

    pub fn without_ids(&self, ids: &[&str]) -> PatternRegistry {
        self.filtered(|p| !ids.contains(&p.id()))
    }

    pub fn without_class(&self, class: OperatorClass) -> PatternRegistry {
        self.filtered(|p| p.operator_class() != class)
    }

    pub fn only_class(&self, class: OperatorClass) -> PatternRegistry {
        self.filtered(|p| p.operator_class() == class)
    }
}

impl<'a> IntoIterator for &'a PatternRegistry {
    type Item = &'a PatternDefinition;
    type IntoIter = std::slice::Iter<'a, PatternDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}
