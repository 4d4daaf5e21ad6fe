//! Error types for the HAL crate.

use qtape_ir::IrError;
use thiserror::Error;

/// Errors that can occur in device operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// A wire label is not known to the device.
    #[error("Unknown wire: {0}")]
    UnknownWire(String),

    /// Unsupported feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// The device cannot apply an operation or measure an observable.
    #[error("Operation '{0}' is not supported by this device")]
    UnsupportedOperation(String),

    /// A state passed to or read from the device is malformed.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The tape uses more wires than the device provides.
    #[error("Tape uses {requested} wires, but the device has {available}")]
    TooManyWires {
        /// Number of wires the tape uses.
        requested: usize,
        /// Number of wires the device provides.
        available: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by the tape itself.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
