//! Error types for device communication, payload decoding and registry setup

use std::fmt;
use std::time::Duration;

/// Result type alias for protocol client calls
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors a protocol client can report for a single call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The call did not complete within its timeout
    Timeout(Duration),

    /// Connection or transfer failure
    Transport(String),

    /// The device (or its bridge) answered with a non-success status
    Rejected(u16),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Timeout(after) => write!(f, "timed out after {after:?}"),
            DeviceError::Transport(msg) => write!(f, "transport error: {msg}"),
            DeviceError::Rejected(status) => write!(f, "device rejected request: {status}"),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            DeviceError::Rejected(status.as_u16())
        } else {
            DeviceError::Transport(err.to_string())
        }
    }
}

/// A status payload that could not be decoded
#[derive(Debug)]
pub struct ParseError(serde_json::Error);

impl ParseError {
    pub(crate) fn new(err: serde_json::Error) -> Self {
        Self(err)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed status payload: {}", self.0)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Errors raised while building the device registry at startup
#[derive(Debug)]
pub enum RegistryError {
    /// The configured device type has no client implementation
    UnsupportedType { name: String, device_type: String },

    /// Two devices share the same gateway id
    DuplicateKey(String),

    /// Neither the device nor the config names a bridge address
    MissingAddress(String),

    /// The HTTP client could not be constructed
    Client(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnsupportedType { name, device_type } => {
                write!(f, "device '{name}' has unsupported type '{device_type}'")
            }
            RegistryError::DuplicateKey(key) => write!(f, "duplicate device id '{key}'"),
            RegistryError::MissingAddress(name) => {
                write!(f, "no bridge address configured for device '{name}'")
            }
            RegistryError::Client(msg) => write!(f, "failed to build device client: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}
