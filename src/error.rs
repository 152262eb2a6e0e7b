//! Error types for the lookup cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Key Error Enum ==
/// Reasons a cache key could not be extracted from an event.
///
/// Never surfaced to callers of the engine: an event without a usable key
/// is simply passed through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A key field is absent from the event
    #[error("Missing key field: {0}")]
    MissingField(String),

    /// A key field holds a value that has no string form
    #[error("Unsupported type for key field {field}: {kind}")]
    UnsupportedType { field: String, kind: &'static str },
}

// == Config Error Enum ==
/// Invalid lookup configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Backoff growth factor below 1.0
    #[error("Backoff factor must be >= 1.0, got {0}")]
    InvalidFactor(f64),

    /// Backoff cap smaller than the base duration
    #[error("Backoff max must not be below the base duration")]
    MaxBelowBase,

    /// Neither the config nor the runner declares key fields
    #[error("No key fields configured and the runner declares none")]
    NoKeyFields,
}

// == Lookup Error Enum ==
/// Unified error type for lookups.
///
/// Cloneable so a stored failure can be handed to every caller that
/// lands inside the backoff window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// The runner failed
    #[error("Lookup failed: {0}")]
    Runner(String),

    /// Lookup results could not be merged into the event
    #[error("Merge failed: {0}")]
    Merge(String),

    /// The submitted event is not a JSON object
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The engine configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match &self {
            LookupError::InvalidEvent(_) => StatusCode::BAD_REQUEST,
            LookupError::Runner(_) => StatusCode::BAD_GATEWAY,
            LookupError::Merge(_) | LookupError::Config(_) | LookupError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for lookups.
pub type Result<T> = std::result::Result<T, LookupError>;
