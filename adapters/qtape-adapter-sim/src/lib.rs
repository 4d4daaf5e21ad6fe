//! Reference statevector device for quantum tapes.
//!
//! [`DefaultQubit`] keeps a dense statevector over a declared list of wires
//! and applies every operation of the `qtape-ir` catalog. It is the device
//! the gradient engine is tested against, and the one that exposes its
//! state for reversible differentiation.
//!
//! # Features
//!
//! - **Exact Results**: expectations, variances and probabilities are
//!   computed from the full statevector
//! - **Sampling**: sample measurements draw eigenvalues with a seedable RNG
//! - **Statevector Access**: implements [`qtape_hal::StatevectorAccess`]
//!
//! # Performance
//!
//! | Wires | Memory | Simulation Speed |
//! |-------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Moderate |
//! | 24 | ~256 MB | Slow |
//!
//! # Example
//!
//! ```ignore
//! use qtape_adapter_sim::DefaultQubit;
//! use qtape_hal::Device;
//! use qtape_ir::{Observable, Operation, Tape};
//!
//! let tape = Tape::build(|rec| {
//!     rec.apply(Operation::hadamard(0))
//!         .apply(Operation::cnot(0, 1))
//!         .probs([0, 1]);
//!     Ok(())
//! })?;
//!
//! let mut dev = DefaultQubit::with_num_wires(2)?;
//! let results = dev.execute(&tape)?;
//! // ~50% |00⟩ and ~50% |11⟩
//! println!("{:?}", results[0]);
//! ```

mod simulator;
mod statevector;

pub use simulator::{DEFAULT_SHOTS, DefaultQubit, MAX_WIRES};
pub use statevector::Statevector;
