#![deny(unsafe_code)]
//! # obligo-types
//!
//! Shared data model for the obligo operator/obligation pipeline.
//!
//! - [`OperatorClass`] / [`OperatorMatch`]: what the detector emits
//! - [`Field`] / [`FieldEvidence`] / [`ObligationInstance`]: what the engine derives
//! - [`DetectionResult`] / [`ObligationResult`]: the serialized stage outputs
//! - [`hash`]: the cryptographic `digest16` and the legacy `change_fingerprint`
//!
//! Every map in this crate is a `BTreeMap` and every set a `BTreeSet`, so
//! serializing any of these types is stable across runs and platforms.

pub mod error;
pub mod hash;
pub mod obligation;
pub mod operator;
pub mod result;

pub use error::TagParseError;
pub use hash::{change_fingerprint, digest16, digest16_json, domain_digest16, is_hash16, GENESIS_HASH};
pub use obligation::{
    Field, FieldEvidence, ObligationInstance, ObligationStatus, ObligationType, StatusSummary,
};
pub use operator::{Captures, MatchMetadata, OperatorClass, OperatorMatch, Span};
pub use result::{DetectionResult, ObligationResult};
