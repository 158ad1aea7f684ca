use obligo_detect::DetectError;
use obligo_engine::EngineError;
use obligo_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("detection failed: {0}")]
    Detect(#[from] DetectError),

    #[error("engine setup failed: {0}")]
    Engine(#[from] EngineError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown pattern id in configuration: {0}")]
    UnknownPattern(String),

    #[error("canonicalization rule {rule} is invalid: {reason}")]
    InvalidCanonicalRule { rule: &'static str, reason: String },

    #[error("failed to initialise tracing: {0}")]
    Telemetry(String),

    #[error("batch worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
