//! Error types for the rambler pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RamblerError {
    #[error("Input text cannot be empty")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Returned by pipeline stages; the orchestrator records the fragment
    /// as unclassifiable.
    #[error("Stage error: {0}")]
    Stage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RamblerError>;
