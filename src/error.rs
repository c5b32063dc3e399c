//! Custom error types for gscholar-profile.
//!
//! Every fallible library function returns `Result<T, ProfileError>`.
//! Stages that degrade instead of failing express that through their own
//! outcome types; this enum covers what is left over.

use thiserror::Error;

/// Main error type for profile retrieval.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML or record parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by the data source
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Data source returned an unexpected status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// CAPTCHA / unusual traffic page served instead of content
    #[error("CAPTCHA detected, the data source is blocking requests")]
    Captcha,

    /// The author could not be resolved by id or by search
    #[error("Author not found: {0}")]
    NotFound(String),

    /// The wall-clock budget for the fetch was exceeded
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// A single record failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Neither a fresh, a cached, nor a placeholder document could be produced
    #[error("No result document could be produced: {0}")]
    NoDocument(String),
}

/// Result type alias using `ProfileError`
pub type Result<T> = std::result::Result<T, ProfileError>;
