#![deny(unsafe_code)]
//! # obligo-engine
//!
//! Deterministic obligation instantiation over a detector's match list.
//!
//! ```text
//! [OperatorMatch] ──► extract_evidence (per match)
//!                 ──► bind nearby evidence (midpoint window)
//!                 ──► ObligationResult { obligations, status_summary }
//! ```
//!
//! REQ, DEF, CAUSE and SCOPE matches each trigger one obligation; UNIV and
//! ANCHOR never do. An obligation is `SATISFIED` when every required field
//! has evidence and `OPEN` otherwise.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod vocabulary;

pub use config::{EngineConfig, PROXIMITY_WINDOW_V1};
pub use engine::{obligation_type_for, ObligationEngine, ENGINE_VERSION};
pub use error::{EngineError, Result};
pub use extract::extract_evidence;
pub use vocabulary::{ScopeVocabulary, VOCABULARY_VERSION};
