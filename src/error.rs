//! Error types for vpnctl

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VpnctlError {
    /// Required field missing or invalid on create/update
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Operation on an unknown identifier
    #[error("Not found: {0}")]
    NotFound(String),
    /// Duplicate identifier
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// A pending transition was superseded by a newer one
    #[error("Cancelled: {0}")]
    Cancelled(String),
    /// Tunnel driver reported a failure
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },
    /// Not supported
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Service error
    #[error("Service error: {0}")]
    ServiceError(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for VpnctlError {
    fn from(error: serde_json::Error) -> Self {
        VpnctlError::ParseError(error.to_string())
    }
}

pub type VpnctlResult<T> = Result<T, VpnctlError>;
