//! Error types for the advisor suite

use thiserror::Error;

/// Result type alias for suite operations
pub type Result<T> = std::result::Result<T, SuiteError>;

/// Failures at the generative-AI service boundary.
///
/// Every gateway call is best-effort and independently fallible; callers can
/// tell transport problems apart from an unusable model reply.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway rejected request (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Empty response from gateway")]
    EmptyResponse,

    #[error("Malformed gateway JSON: {reason} | raw={raw}")]
    MalformedJson { reason: String, raw: String },

    #[error("Gateway response missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Error, Debug)]
pub enum SuiteError {

    // =============================
    // Core Errors
    // =============================

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
