#![deny(unsafe_code)]
//! # obligo-detect
//!
//! Versioned pattern registry and the deterministic operator detector.
//!
//! ```text
//! text ──► detect(text, registry) ──► DetectionResult { matches (sorted), input_hash, .. }
//! ```
//!
//! - [`PatternDefinition`]: id, operator class, lexical rule, capture names, optional metadata rule
//! - [`PatternRegistry`]: immutable ordered set of definitions; [`PatternRegistry::v1`] is the builtin ruleset
//! - [`detect`] / [`Detector`]: pure scan over every pattern, then one global sort
//!   by `(char_start, pattern_id)`
//! - [`LexicalMatcher`]: matcher seam; [`RegexMatcher`] is the builtin implementation

pub mod detector;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod registry;
pub mod rules;

pub use detector::{detect, Detector, DETECTOR_VERSION};
pub use error::{DetectError, MatcherError};
pub use matcher::{LexicalMatcher, RawMatch, RegexMatcher};
pub use pattern::{MatchView, MetadataRule, PatternDefinition};
pub use registry::PatternRegistry;
pub use rules::{PatternSpec, RULESET_VERSION, V1_PATTERNS};
