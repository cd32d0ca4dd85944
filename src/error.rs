//! Error types for wg-converge
//!
//! This module defines the error types used throughout the crate.
//! We use `thiserror` for the library error and `anyhow` for
//! error propagation in the binary.
//!
//! Every reconciliation failure maps onto exactly one variant so the caller
//! can tell "nothing was touched" apart from "the live interface changed but
//! the file on disk did not follow".

use thiserror::Error;

/// Main error type for wg-converge operations
#[derive(Error, Debug)]
pub enum ConvergeError {
    /// Tool settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed interface specification input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed peer entry, identified by its position in the input
    #[error("Invalid peer spec at index {index}: {reason}")]
    InvalidPeerSpec {
        /// Zero-based position of the peer in the caller's list
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Current state could not be determined
    #[error("Probe error: {0}")]
    Probe(String),

    /// Existing configuration could not be preserved before an overwrite
    #[error("Backup error: {0}")]
    Backup(String),

    /// Key pair generation failed
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Tunnel control rejected the configuration
    #[error("Apply error: {0}")]
    Apply(String),

    /// Tunnel control failed to tear the interface down
    #[error("Teardown error: {0}")]
    Teardown(String),

    /// Live state changed but the configuration file could not be updated
    #[error("Persist error: {0}")]
    Persist(String),

    /// External command could not be run or exited unsuccessfully
    #[error("Command error: {0}")]
    Command(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Permission errors
    #[error("Permission denied: {0}")]
    Permission(String),
}

impl ConvergeError {
    /// Short machine-readable name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Validation(_) | Self::InvalidPeerSpec { .. } => "validation",
            Self::Probe(_) => "probe",
            Self::Backup(_) => "backup",
            Self::KeyGeneration(_) => "key_generation",
            Self::Apply(_) => "apply",
            Self::Teardown(_) => "teardown",
            Self::Persist(_) => "persist",
            Self::Command(_) => "command",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Permission(_) => "permission",
        }
    }

    /// Whether the error was raised before anything on the host was touched
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidPeerSpec { .. })
    }

    /// Whether live state changed even though the operation reports an error
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Persist(_))
    }
}

/// Result type alias using ConvergeError
pub type Result<T> = std::result::Result<T, ConvergeError>;

impl From<serde_json::Error> for ConvergeError {
    fn from(err: serde_json::Error) -> Self {
        ConvergeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConvergeError {
    fn from(err: toml::de::Error) -> Self {
        ConvergeError::Config(err.to_string())
    }
}
