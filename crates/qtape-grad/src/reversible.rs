//! Reversible analytic differentiation.
//!
//! The tape is executed once and its pre-measurement state `|ψ⟩` cached. For
//! a parameter of a gate `G(θ) = exp(i·m·θ·P)` followed by the suffix `S`,
//! the state `|φ⟩ = S·P·S†|ψ⟩` is obtained by replaying the suffix backward,
//! inserting the bare generator `P`, and replaying it forward. Then
//!
//! ```text
//!   ∂⟨O⟩/∂θ = 2 · m · Im ⟨φ| O |ψ⟩
//! ```
//!
//! Only expectation values of gates in {RX, RY, RZ, Rot} are supported, and
//! the device must expose its statevector.

use ndarray::{Array1, ArrayD};
use num_complex::Complex64;
use std::iter;
use tracing::{debug, instrument};

use qtape_hal::{Device, HalError, HalResult};
use qtape_ir::{OpKind, Operation, ReturnKind, Tape};

use crate::contraction::matrix_element;
use crate::error::{GradError, GradResult};
use crate::gradient::{AnalyticRule, locate};

/// Reversible differentiation backend.
#[derive(Debug, Clone, Default)]
pub struct ReversibleDiff {
    cached: Option<ArrayD<Complex64>>,
}

impl ReversibleDiff {
    /// Create a backend with an empty state cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached pre-measurement state, if any.
    pub fn cached_state(&self) -> Option<&ArrayD<Complex64>> {
        self.cached.as_ref()
    }

    /// Execute the tape once and cache its state, unless already cached.
    fn ensure_state(&mut self, tape: &Tape, device: &mut dyn Device) -> GradResult<ArrayD<Complex64>> {
        if let Some(state) = &self.cached {
            return Ok(state.clone());
        }
        debug!("Caching pre-measurement state");
        device.execute(tape)?;
        let name = device.name().to_string();
        let access = device
            .statevector()
            .ok_or(GradError::UnsupportedDevice(name))?;
        let state = access
            .state()
            .ok_or_else(|| HalError::InvalidState("no state after execution".into()))?;
        self.cached = Some(state.clone());
        Ok(state)
    }
}

/// Generator, multiplier and suffix of the gate owning a parameter.
fn local_circuit(op: &Operation, local: usize) -> GradResult<(Operation, f64, Vec<Operation>)> {
    let unsupported = || GradError::UnsupportedOperation(op.name().to_string());
    match op.kind() {
        OpKind::Rot => {
            let parts = op.decomposition().ok_or_else(unsupported)?;
            // Inverted decompositions are reversed.
            let component = if op.is_inverse() {
                parts.len() - 1 - local
            } else {
                local
            };
            let (generator, multiplier) = parts[component].generator().ok_or_else(unsupported)?;
            Ok((generator, multiplier, parts[component + 1..].to_vec()))
        }
        _ => {
            let (generator, multiplier) = op.generator().ok_or_else(unsupported)?;
            Ok((generator, multiplier, Vec::new()))
        }
    }
}

impl AnalyticRule for ReversibleDiff {
    fn name(&self) -> &str {
        "reversible"
    }

    fn supports(&self, op: &Operation) -> bool {
        matches!(op.kind(), OpKind::RX | OpKind::RY | OpKind::RZ | OpKind::Rot)
    }

    fn reset(&mut self) {
        self.cached = None;
    }

    #[instrument(skip(self, tape, device))]
    fn partial(
        &mut self,
        tape: &Tape,
        device: &mut dyn Device,
        idx: usize,
    ) -> GradResult<Array1<f64>> {
        for m in tape.measurements() {
            if m.kind() != ReturnKind::Expectation || m.observable().is_none() {
                return Err(GradError::UnsupportedObservable(m.to_string()));
            }
        }
        let (position, op, local) =
            locate(tape, idx).ok_or(GradError::NonDifferentiableParameter { params: vec![idx] })?;
        if !self.supports(&op) {
            return Err(GradError::UnsupportedOperation(op.name().to_string()));
        }
        if device.statevector().is_none() {
            return Err(GradError::UnsupportedDevice(device.name().to_string()));
        }

        let (generator, multiplier, mut suffix) = local_circuit(&op, local)?;
        suffix.extend(tape.flat_operations().into_iter().skip(position + 1));
        let replay: Vec<Operation> = suffix
            .iter()
            .rev()
            .cloned()
            .map(Operation::inv)
            .chain(iter::once(generator))
            .chain(suffix.iter().cloned())
            .collect();

        let state = self.ensure_state(tape, device)?;
        let name = device.name().to_string();
        let access = device
            .statevector()
            .ok_or(GradError::UnsupportedDevice(name))?;

        access.set_state(state.clone())?;
        let replayed = access.apply_operations(&replay);
        let perturbed = access.state();
        access.set_state(state.clone())?;
        replayed?;
        let perturbed =
            perturbed.ok_or_else(|| HalError::InvalidState("no state after replay".into()))?;

        let mut column = Vec::with_capacity(tape.measurements().len());
        for obs in tape.observables() {
            let axes = obs
                .wires()
                .iter()
                .map(|w| access.wire_position(w))
                .collect::<HalResult<Vec<_>>>()?;
            let element = matrix_element(&perturbed, &obs.matrix(), &axes, &state)?;
            column.push(2.0 * multiplier * element.im);
        }
        Ok(Array1::from(column))
    }
}
