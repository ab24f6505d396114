//! Bench error types

use grouper_planner::PlannerError;
use thiserror::Error;

/// Bench error types
#[derive(Debug, Error)]
pub enum BenchError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be merged
    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// Planner failure
    #[error(transparent)]
    Planner(#[from] PlannerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for bench operations
pub type BenchResult<T> = Result<T, BenchError>;
