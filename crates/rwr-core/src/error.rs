//! Unified error types for RWR.

use thiserror::Error;

/// Result type alias using RwrError.
pub type Result<T> = std::result::Result<T, RwrError>;

#[derive(Error, Debug)]
pub enum RwrError {
    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A setter received a value outside its allowed range. The active policy is unchanged.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    // Reset errors
    #[error("A reset of '{0}' is already in progress")]
    ResetInProgress(String),

    #[error("Reset service stopped")]
    ServiceStopped,

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}
