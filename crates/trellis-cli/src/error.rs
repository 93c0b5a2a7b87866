//! CLI error types

use thiserror::Error;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stack validation error
    #[error("Invalid stack: {0}")]
    Validation(#[from] trellis_graph::ValidationError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] trellis_engine::EngineError),

    /// State file error
    #[error("State file error: {0}")]
    State(#[from] trellis_engine::StateStoreError),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
