//! Device traits.
//!
//! A [`Device`] executes a [`Tape`] and returns one raw result vector per
//! measurement:
//!
//! ```text
//!   capabilities() ──→ validate() ──→ execute() ──→ Vec<Array1<f64>>
//!                                 └─→ jacobian()   (optional)
//!                                 └─→ statevector() (optional)
//! ```
//!
//! | Method | Required | Returns |
//! |--------|----------|---------|
//! | `name()` | yes | `&str` |
//! | `capabilities()` | yes | `&Capabilities` |
//! | `validate()` | provided | `HalResult<()>` |
//! | `execute()` | yes | `HalResult<Vec<Array1<f64>>>` |
//! | `jacobian()` | provided (unsupported) | `HalResult<Array2<f64>>` |
//! | `statevector()` | provided (`None`) | `Option<&mut dyn StatevectorAccess>` |

use ndarray::{Array1, Array2, ArrayD};
use num_complex::Complex64;

use qtape_ir::{Operation, Tape, Wire};

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};

/// A quantum device that can execute tapes.
///
/// # Contract
///
/// - `capabilities()` is infallible and cached at construction time.
/// - `execute()` returns exactly one vector per measurement, in measurement
///   order: length 1 for expectations and variances, `2^k` for probabilities
///   over `k` wires, `shots` for samples.
/// - Devices that keep a statevector expose it through `statevector()`; the
///   stored state is the one *before* any diagonalizing rotations.
pub trait Device {
    /// Get the name of this device.
    fn name(&self) -> &str;

    /// Get the capabilities of this device.
    fn capabilities(&self) -> &Capabilities;

    /// Check a tape against the device's capabilities.
    fn validate(&self, tape: &Tape) -> HalResult<()> {
        let caps = self.capabilities();
        let requested = tape.num_wires();
        if requested > caps.num_wires as usize {
            return Err(HalError::TooManyWires {
                requested,
                available: caps.num_wires as usize,
            });
        }
        for op in tape.flat_operations() {
            if !caps.supports_operation(op.name()) {
                return Err(HalError::UnsupportedOperation(op.name().to_string()));
            }
        }
        Ok(())
    }

    /// Execute a tape and return the raw per-measurement results.
    fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>>;

    /// Compute the Jacobian of the tape natively, with shape
    /// `(output_dim, num_trainable)`.
    fn jacobian(&mut self, _tape: &Tape) -> HalResult<Array2<f64>> {
        Err(HalError::Unsupported(format!(
            "device '{}' does not provide a native Jacobian",
            self.name()
        )))
    }

    /// Access the device's statevector, if it keeps one.
    fn statevector(&mut self) -> Option<&mut dyn StatevectorAccess> {
        None
    }
}

/// Read and write access to a device's statevector.
///
/// States are exchanged as tensors of shape `[2; n]`. The wire at position
/// `k` (see [`wire_position`](Self::wire_position)) is axis `k`; position 0 is
/// the most significant bit of a flat basis-state index.
pub trait StatevectorAccess {
    /// Number of wires in the state.
    fn num_wires(&self) -> usize;

    /// Position (tensor axis) of a wire.
    fn wire_position(&self, wire: &Wire) -> HalResult<usize>;

    /// The state after the last execution, before any diagonalizing rotations.
    fn state(&self) -> Option<ArrayD<Complex64>>;

    /// Overwrite the state.
    fn set_state(&mut self, state: ArrayD<Complex64>) -> HalResult<()>;

    /// Apply operations to the current state.
    fn apply_operations(&mut self, ops: &[Operation]) -> HalResult<()>;
}
