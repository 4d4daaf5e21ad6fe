//! Error types for execution and differentiation.

use qtape_hal::HalError;
use qtape_ir::IrError;
use thiserror::Error;

/// Errors that can occur while executing or differentiating a tape.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradError {
    /// The requested differentiation method is not known.
    #[error("Unknown gradient method '{0}'; expected one of best, analytic, numeric, device")]
    UnknownGradientMethod(String),

    /// Finite-difference order outside {1, 2}.
    #[error("Order must be 1 or 2, got {0}")]
    UnsupportedOrder(u32),

    /// Parameters that cannot be differentiated with the requested method.
    #[error("Cannot differentiate with respect to parameter(s) {{{}}}", join_indices(.params))]
    NonDifferentiableParameter {
        /// Global indices of the offending parameters.
        params: Vec<usize>,
    },

    /// The reversible strategy only supports expectation values.
    #[error("Measurement {0} is not supported with the reversible gradient method")]
    UnsupportedObservable(String),

    /// The reversible strategy cannot differentiate this operation.
    #[error("The {0} operation is not supported using the reversible differentiation method")]
    UnsupportedOperation(String),

    /// The device lacks a feature the strategy needs.
    #[error("Device '{0}' does not expose its statevector")]
    UnsupportedDevice(String),

    /// A parameter override targets a non-scalar parameter.
    #[error("Parameter {0} is not a real scalar")]
    NonScalarParameter(usize),

    /// The device returned results of an unexpected shape.
    #[error("Result mismatch: {0}")]
    ResultMismatch(String),

    /// Array reshaping failed.
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Error raised by the tape.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Error raised by the device.
    #[error(transparent)]
    Hal(#[from] HalError),
}

fn join_indices(params: &[usize]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for execution and differentiation.
pub type GradResult<T> = Result<T, GradError>;
