//! Error types for the adapt_core library.
//!
//! Sparse data is never an error here: scoring functions degrade to a
//! zero-confidence result instead. Only malformed input, ordering
//! violations and collaborator failures surface as `Error`.

use chrono::{DateTime, Utc};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for adapt_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Observation carried out-of-domain values and was rejected at ingestion
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// Observation arrived with a timestamp older than the newest buffered one
    #[error("Out-of-order observation for {exercise_id}: {got} is before {last}")]
    OutOfOrder {
        exercise_id: String,
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    /// Repository, catalog or movement provider could not be reached
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    /// Engine lifecycle misuse (e.g. observing before `open`)
    #[error("State error: {0}")]
    State(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
