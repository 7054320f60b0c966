//! Error types for santulan

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Santulan error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sensor read failure (fatal for the balancing session)
    #[error("Sensor read failed: {0}")]
    Sensor(String),

    /// Motor driver failure
    #[error("Motor driver error: {0}")]
    Motor(String),

    /// Tuning update with out-of-range or malformed value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration load/save failure (non-fatal, last-known-good retained)
    #[error("Config persistence error: {0}")]
    ConfigPersistence(String),

    /// Configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration serialization error
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Wire serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed or oversized wire frame
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
