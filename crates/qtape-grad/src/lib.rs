//! Execution and differentiation of quantum tapes.
//!
//! This crate runs [`Tape`](qtape_ir::Tape)s on any
//! [`Device`](qtape_hal::Device) and computes their Jacobians with respect to
//! the trainable parameters.
//!
//! # Strategies
//!
//! | Method | How |
//! |--------|-----|
//! | `best` | per parameter: zero, finite differences or analytic, from the inferred tag |
//! | `analytic` | the configured [`AnalyticRule`] for every parameter |
//! | `numeric` | finite differences for every parameter |
//! | `device` | the device's native Jacobian |
//!
//! The analytic backend shipped here is [`ReversibleDiff`], which executes
//! the tape once and obtains every partial derivative by replaying the cached
//! statevector through a local circuit.
//!
//! # Example
//!
//! ```ignore
//! use qtape_adapter_sim::DefaultQubit;
//! use qtape_grad::{GradientEngine, JacobianOptions, execute};
//! use qtape_ir::{Observable, Operation, Tape};
//!
//! let mut tape = Tape::build(|rec| {
//!     rec.apply(Operation::rx(0.543, 0))
//!         .apply(Operation::ry(-0.654, 1))
//!         .apply(Operation::cnot(0, 1))
//!         .expval(Observable::PauliZ(0.into()).tensor(Observable::PauliX(1.into())));
//!     Ok(())
//! })?;
//! let mut dev = DefaultQubit::with_num_wires(2)?;
//!
//! let value = execute(&mut tape, &mut dev, None)?;
//! let jac = GradientEngine::reversible().jacobian(&mut tape, &mut dev, &JacobianOptions::new())?;
//! assert_eq!(jac.dim(), (1, 2));
//! ```

pub mod contraction;
pub mod error;
pub mod executor;
pub mod gradient;
pub mod options;
pub mod reversible;

pub use contraction::matrix_element;
pub use error::{GradError, GradResult};
pub use executor::{MeasurementValue, execute, execute_flat, flatten};
pub use gradient::{AnalyticRule, GradientEngine};
pub use options::{DEFAULT_STEP, DiffMethod, JacobianOptions};
pub use reversible::ReversibleDiff;
