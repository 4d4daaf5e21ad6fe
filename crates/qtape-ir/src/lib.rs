//! Quantum tape intermediate representation.
//!
//! This crate records quantum circuits as *tapes*: ordered lists of
//! operations followed by measurements, with every numeric parameter given a
//! global index so that the tape can be differentiated parameter by
//! parameter.
//!
//! # Core Components
//!
//! - **Wires and parameters**: [`Wire`] labels (integers or strings may be
//!   mixed) and [`Param`] values
//! - **Operations**: the closed [`OpKind`] catalog and [`Operation`] with
//!   matrices, decompositions and generators
//! - **Observables and measurements**: [`Observable`], [`Measurement`],
//!   [`ReturnKind`]
//! - **Recording**: [`Recorder`] handles passed to [`Tape::build`] and
//!   [`Tape::record`]
//! - **Tape**: [`Tape`] with its parameter table ([`ParameterInfo`]),
//!   inversion and expansion ([`ExpandOptions`])
//! - **Dependency graph**: [`CircuitGraph`] answering which operations can
//!   influence which measurements
//!
//! # Example
//!
//! ```rust
//! use qtape_ir::{Observable, Operation, Param, Tape};
//!
//! let mut tape = Tape::build(|rec| {
//!     rec.apply(Operation::rx(0.543, 0))
//!         .apply(Operation::ry(-0.654, 1))
//!         .apply(Operation::cnot(0, 1))
//!         .expval(Observable::PauliZ(0.into()).tensor(Observable::PauliX(1.into())));
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(tape.num_params(), 2);
//! assert_eq!(tape.output_dim(), 1);
//!
//! tape.set_trainable_params([1]).unwrap();
//! assert_eq!(tape.get_parameters(true), vec![Param::Real(-0.654)]);
//! ```

pub mod error;
pub mod expand;
pub mod graph;
pub mod instruction;
pub mod measurement;
pub mod observable;
pub mod operation;
pub mod param;
pub mod recorder;
pub mod tape;
pub mod wire;

pub use error::{IrError, IrResult};
pub use expand::{ExpandOptions, StopPredicate};
pub use graph::{CircuitGraph, GraphNode};
pub use instruction::Instruction;
pub use measurement::{Measurement, ReturnKind};
pub use observable::{Observable, hermitian_eigh};
pub use operation::{OpKind, Operation, adjoint};
pub use param::Param;
pub use recorder::{ObservableHandle, Recorder};
pub use tape::{GradMethod, ParamOwner, ParameterInfo, Tape};
pub use wire::Wire;
