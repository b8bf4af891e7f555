//! Error types for corsgate-core
//!
//! The CORS decision itself never fails; these cover the surfaces around
//! it (configuration, request conversion, the backend round-trip).

use thiserror::Error;

/// Result type alias for corsgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the corsgate proxy
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Body exceeded the configured size limit
    #[error("Body too large: exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Backend request failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// IO error (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hyper error (native only)
    #[cfg(feature = "native")]
    #[error("HTTP error: {0}")]
    Hyper(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
