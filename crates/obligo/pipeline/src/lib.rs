#![deny(unsafe_code)]
//! # obligo-pipeline
//!
//! End-to-end analysis over the detector, engine and ledger crates.
//!
//! ```text
//! raw text ──► Canonicalizer ──► detect ──► ObligationEngine ──► Analysis
//! pdf bytes ─► PdfExtractor ──┘                                    │
//!                                                 Pipeline::record ▼
//!                                                           LedgerHandle
//! ```
//!
//! - [`Pipeline`]: owns a (possibly filtered) registry, an engine and a canonicalizer
//! - [`Canonicalizer`] / [`PdfExtractor`]: collaborator seams
//! - [`PipelineConfig`]: defaults, optional file, `OBLIGO_*` environment
//! - [`telemetry::init_tracing`]: global `tracing` subscriber

pub mod canonicalize;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;

pub use canonicalize::{IdentityCanonicalizer, StandardCanonicalizer, STANDARD_RULES};
pub use collaborators::{CanonicalText, Canonicalizer, PdfExtraction, PdfExtractor, RejectionCode};
pub use config::{BatchConfig, DetectionConfig, LedgerConfig, LoggingConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{Analysis, AnalysisOutcome, Pipeline};
pub use telemetry::init_tracing;
