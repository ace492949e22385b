//! GuardDog error types

use thiserror::Error;

/// GuardDog error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed rule or configuration file
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Content rejected before classification (oversized, non-text)
    #[error("Input error: {0}")]
    Input(String),

    /// Matcher fault, e.g. a corrupted pattern definition
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for GuardDog operations
pub type Result<T> = std::result::Result<T, Error>;
