//! Error types for the IR crate.

use thiserror::Error;

use crate::wire::Wire;

/// Errors that can occur while recording or manipulating a tape.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// An item was queued in an order the tape cannot represent.
    #[error("{0}")]
    ConstructionOrder(String),

    /// An observable was queued without a wrapping measurement.
    #[error("Observable {name} does not have a measurement type specified")]
    UnboundObservable {
        /// Name of the unbound observable.
        name: String,
    },

    /// Trainable parameter index out of range.
    #[error(
        "Trainable parameter index {index} is out of range; the tape has at most {num_params} parameters (max valid index {})",
        format_max_index(*.num_params)
    )]
    ParameterIndex {
        /// The offending index.
        index: usize,
        /// Total number of parameters on the tape.
        num_params: usize,
    },

    /// Wrong number of values passed to `set_parameters`.
    #[error("Number of provided parameters does not match: expected {expected}, got {got}")]
    ParameterCountMismatch {
        /// Number of parameters the tape expects.
        expected: usize,
        /// Number of values provided.
        got: usize,
    },

    /// Operation constructed with the wrong number of wires.
    #[error("Operation '{name}' requires {expected} wires, got {got}")]
    WireCountMismatch {
        /// Name of the operation.
        name: String,
        /// Expected number of wires.
        expected: usize,
        /// Actual number of wires provided.
        got: usize,
    },

    /// Operation constructed with the wrong number of parameters.
    #[error("Operation '{name}' takes {expected} parameters, got {got}")]
    OperationParamMismatch {
        /// Name of the operation.
        name: String,
        /// Expected number of parameters.
        expected: usize,
        /// Actual number of parameters provided.
        got: usize,
    },

    /// Measurements sharing a wire need different diagonalizing rotations.
    #[error("Measurements on wire {wire} do not share a measurement basis")]
    MeasurementBasisConflict {
        /// The shared wire.
        wire: Wire,
    },

    /// Numerical linear algebra failed.
    #[error("Linear algebra error: {0}")]
    Linalg(String),
}

fn format_max_index(num_params: usize) -> String {
    match num_params.checked_sub(1) {
        Some(max) => max.to_string(),
        None => "none".to_string(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
