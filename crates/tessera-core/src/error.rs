use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems detected before touching the engine.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_sequences must be at least 1")]
    NoSequences,

    #[error("cache_reservation ({reserved}) must be smaller than max_sequences ({max})")]
    ReservationTooLarge { reserved: u32, max: u32 },

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Startup failures. None of these have a degraded mode; the caller decides
/// whether to exit.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to load model/context: {0}")]
    ModelLoad(String),

    #[error("failed to initialize sampler: {0}")]
    Sampler(String),

    #[error(
        "model does not have a chat template; old llava models need chat_template \"vicuna\", \
         MobileVLM needs \"deepseek\", Mistral Small 3.1 needs \"mistral-v7\""
    )]
    MissingChatTemplate,

    #[error("chat template failed to render: {0}")]
    Template(String),

    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("failed to load vision model from {path}: {reason}")]
    VisionLoad { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, InitError>;
