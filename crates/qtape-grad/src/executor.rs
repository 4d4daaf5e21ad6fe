//! Tape execution with transient parameter overrides.
//!
//! ```text
//!   params? ──→ override trainable values ──→ device.execute()
//!                                                   │
//!   restore old values ←── reshape per measurement ←┘
//! ```

use ndarray::Array1;
use std::fmt;
use tracing::{debug, instrument};

use qtape_hal::Device;
use qtape_ir::{IrError, Param, ReturnKind, Tape};

use crate::error::{GradError, GradResult};

/// The value of one measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementValue {
    /// An expectation value or variance.
    Scalar(f64),
    /// Probabilities (length `2^wires`) or samples (length `shots`).
    Vector(Array1<f64>),
}

impl MeasurementValue {
    /// Get the scalar, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MeasurementValue::Scalar(v) => Some(*v),
            MeasurementValue::Vector(_) => None,
        }
    }

    /// Get the vector, if this is one.
    pub fn as_vector(&self) -> Option<&Array1<f64>> {
        match self {
            MeasurementValue::Scalar(_) => None,
            MeasurementValue::Vector(v) => Some(v),
        }
    }

    /// Number of entries this value contributes to the flattened result.
    pub fn len(&self) -> usize {
        match self {
            MeasurementValue::Scalar(_) => 1,
            MeasurementValue::Vector(v) => v.len(),
        }
    }

    /// Check if the value has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementValue::Scalar(v) => write!(f, "{v}"),
            MeasurementValue::Vector(v) => write!(f, "{v}"),
        }
    }
}

/// Concatenate measurement values into one vector.
pub fn flatten(values: &[MeasurementValue]) -> Array1<f64> {
    let mut out = Vec::with_capacity(values.iter().map(MeasurementValue::len).sum());
    for value in values {
        match value {
            MeasurementValue::Scalar(v) => out.push(*v),
            MeasurementValue::Vector(v) => out.extend(v.iter().copied()),
        }
    }
    Array1::from(out)
}

/// Execute a tape on a device.
///
/// With `params`, the trainable parameters take these values for the duration
/// of the call; the previous values are restored afterward, also on error.
/// The tape's output-dimension estimate is corrected from the actual result.
///
/// Overrides are real scalars only. Every parameter starts out trainable,
/// including matrix parameters such as a Hermitian observable's matrix, so on
/// such a tape the trainable set must be narrowed to scalar parameters with
/// [`Tape::set_trainable_params`] first; otherwise the call fails with
/// [`GradError::NonScalarParameter`].
#[instrument(skip(tape, device, params), fields(device = device.name()))]
pub fn execute(
    tape: &mut Tape,
    device: &mut dyn Device,
    params: Option<&[f64]>,
) -> GradResult<Vec<MeasurementValue>> {
    with_overrides(tape, params, |tape| run(tape, device))
}

/// Execute a tape and return the flattened result.
pub fn execute_flat(
    tape: &mut Tape,
    device: &mut dyn Device,
    params: Option<&[f64]>,
) -> GradResult<Array1<f64>> {
    Ok(flatten(&execute(tape, device, params)?))
}

/// Run `f` with the trainable parameters temporarily set to `params`.
pub(crate) fn with_overrides<T>(
    tape: &mut Tape,
    params: Option<&[f64]>,
    f: impl FnOnce(&mut Tape) -> GradResult<T>,
) -> GradResult<T> {
    let Some(params) = params else {
        return f(tape);
    };

    let saved = tape.get_parameters(true);
    if let Some(pos) = saved.iter().position(|p| !p.is_real()) {
        let idx = tape.trainable_params().iter().copied().nth(pos).unwrap_or(pos);
        return Err(GradError::NonScalarParameter(idx));
    }
    tape.set_parameters(Param::reals(params), true)?;
    let result = f(tape);
    tape.set_parameters(saved, true)?;
    result
}

/// Run a single shifted evaluation of parameter `idx`, restoring it afterward.
pub(crate) fn execute_shifted(
    tape: &mut Tape,
    device: &mut dyn Device,
    idx: usize,
    delta: f64,
) -> GradResult<Array1<f64>> {
    let mut values = tape.get_parameters(false);
    let original = values.get(idx).cloned().ok_or(IrError::ParameterIndex {
        index: idx,
        num_params: values.len(),
    })?;
    let x = original
        .as_real()
        .ok_or(GradError::NonScalarParameter(idx))?;

    values[idx] = Param::Real(x + delta);
    tape.set_parameters(values.clone(), false)?;
    let result = execute_flat(tape, device, None);
    values[idx] = original;
    tape.set_parameters(values, false)?;
    result
}

fn run(tape: &mut Tape, device: &mut dyn Device) -> GradResult<Vec<MeasurementValue>> {
    if tape.measurements().is_empty() {
        return Ok(Vec::new());
    }

    let raw = device.execute(tape)?;
    if raw.len() != tape.measurements().len() {
        return Err(GradError::ResultMismatch(format!(
            "device returned {} results for {} measurements",
            raw.len(),
            tape.measurements().len()
        )));
    }

    let mut values = Vec::with_capacity(raw.len());
    for (m, r) in tape.measurements().iter().zip(raw) {
        let value = match m.kind() {
            ReturnKind::Expectation | ReturnKind::Variance => match r.as_slice() {
                Some([v]) => MeasurementValue::Scalar(*v),
                _ => {
                    return Err(GradError::ResultMismatch(format!(
                        "{} returned {} values, expected 1",
                        m.kind(),
                        r.len()
                    )));
                }
            },
            ReturnKind::Probability => {
                let expected = 1usize << m.wires().len();
                if r.len() != expected {
                    return Err(GradError::ResultMismatch(format!(
                        "probs over {} wires returned {} values, expected {expected}",
                        m.wires().len(),
                        r.len()
                    )));
                }
                MeasurementValue::Vector(r)
            }
            ReturnKind::Sample => MeasurementValue::Vector(r),
        };
        values.push(value);
    }

    let dim: usize = values.iter().map(MeasurementValue::len).sum();
    if dim != tape.output_dim() {
        debug!(
            "Output dimension estimate {} corrected to {}",
            tape.output_dim(),
            dim
        );
        tape.set_output_dim(dim);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_flatten_concatenates() {
        let values = vec![
            MeasurementValue::Scalar(0.5),
            MeasurementValue::Vector(array![0.25, 0.75]),
        ];
        assert_eq!(flatten(&values), array![0.5, 0.25, 0.75]);
        assert_eq!(values[1].len(), 2);
        assert_eq!(values[0].as_scalar(), Some(0.5));
        assert!(values[1].as_scalar().is_none());
    }

    #[test]
    fn test_empty_flatten() {
        assert!(flatten(&[]).is_empty());
    }
}
