//! Errors surfaced by the planner boundary.
//!
//! Scheduling itself never fails: tasks that cannot be placed are reported as
//! data. Only configuration problems and malformed documents become errors.

use thiserror::Error;

/// Result type for planner boundary operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to render TOML configuration: {0}")]
    TomlRender(#[from] toml::ser::Error),
}
