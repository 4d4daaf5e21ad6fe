//! Jacobian assembly.
//!
//! The [`GradientEngine`] tags every parameter with a gradient method, then
//! builds the Jacobian column by column:
//!
//! | Tag | Column |
//! |-----|--------|
//! | `0` | zeros, no device call |
//! | `F` | finite differences (`order = 1` shares one baseline `y0`) |
//! | `A` | the configured [`AnalyticRule`] |
//!
//! With [`DiffMethod::Device`] the whole matrix comes from the device.

use ndarray::{Array1, Array2};
use std::fmt;
use tracing::{debug, instrument};

use qtape_hal::Device;
use qtape_ir::{GradMethod, Instruction, Operation, ParamOwner, Tape};

use crate::error::{GradError, GradResult};
use crate::executor::{execute_flat, execute_shifted, with_overrides};
use crate::options::{DiffMethod, JacobianOptions};
use crate::reversible::ReversibleDiff;

/// A per-parameter analytic differentiation backend.
pub trait AnalyticRule {
    /// Name of the rule.
    fn name(&self) -> &str;

    /// Check if the rule can differentiate the parameters of `op`.
    fn supports(&self, op: &Operation) -> bool;

    /// Drop any state cached by previous calls. Called once at the start of
    /// every Jacobian.
    fn reset(&mut self) {}

    /// Partial derivative of the flattened tape output with respect to the
    /// global parameter `idx`.
    fn partial(
        &mut self,
        tape: &Tape,
        device: &mut dyn Device,
        idx: usize,
    ) -> GradResult<Array1<f64>>;
}

/// Computes Jacobians of tapes on devices.
#[derive(Default)]
pub struct GradientEngine {
    analytic: Option<Box<dyn AnalyticRule>>,
}

impl fmt::Debug for GradientEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientEngine")
            .field("analytic", &self.analytic.as_ref().map(|r| r.name()))
            .finish()
    }
}

impl GradientEngine {
    /// Create an engine without an analytic backend; every differentiable
    /// parameter uses finite differences.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine backed by reversible differentiation.
    pub fn reversible() -> Self {
        Self::new().with_analytic(ReversibleDiff::new())
    }

    /// Set the analytic backend.
    #[must_use]
    pub fn with_analytic(mut self, rule: impl AnalyticRule + 'static) -> Self {
        self.analytic = Some(Box::new(rule));
        self
    }

    /// The configured analytic backend.
    pub fn analytic(&self) -> Option<&dyn AnalyticRule> {
        self.analytic.as_deref()
    }

    // =========================================================================
    // Gradient-method inference
    // =========================================================================

    /// Infer the gradient method of global parameter `idx`.
    ///
    /// Returns `None` for parameters that cannot be differentiated at all:
    /// non-scalar values, state preparations and observable parameters.
    pub fn grad_method(&self, tape: &Tape, idx: usize, use_graph: bool) -> Option<GradMethod> {
        let info = tape.par_info().get(idx)?;
        let ParamOwner::Op(entry) = info.owner else {
            return None;
        };
        let (_, op, local) = locate(tape, idx)?;
        if op.kind().is_state_prep() || !op.kind().is_differentiable() || !op.params()[local].is_real() {
            return None;
        }
        if !self.analytic.as_ref().is_some_and(|rule| rule.supports(&op)) {
            return Some(GradMethod::FiniteDiff);
        }
        if use_graph && !tape.graph().reaches_any_observable(entry) {
            return Some(GradMethod::Zero);
        }
        Some(GradMethod::Analytic)
    }

    /// Store the inferred gradient method of every parameter in the tape.
    pub fn update_gradient_info(&self, tape: &mut Tape) {
        let methods: Vec<Option<GradMethod>> = (0..tape.num_params())
            .map(|idx| self.grad_method(tape, idx, true))
            .collect();
        for (idx, method) in methods.into_iter().enumerate() {
            tape.set_grad_method(idx, method);
        }
    }

    // =========================================================================
    // Partial derivatives
    // =========================================================================

    /// Finite-difference derivative with respect to global parameter `idx`.
    ///
    /// `order = 1` is a forward difference against `y0`, evaluated here if
    /// not given; `order = 2` is a centred difference and ignores `y0`.
    pub fn numeric_pd(
        &self,
        tape: &mut Tape,
        device: &mut dyn Device,
        idx: usize,
        y0: Option<&Array1<f64>>,
        order: u32,
        h: f64,
    ) -> GradResult<Array1<f64>> {
        match order {
            1 => {
                let y0 = match y0 {
                    Some(y0) => y0.clone(),
                    None => execute_flat(tape, device, None)?,
                };
                let y = execute_shifted(tape, device, idx, h)?;
                difference(&y, &y0, h)
            }
            2 => {
                let forward = execute_shifted(tape, device, idx, h / 2.0)?;
                let backward = execute_shifted(tape, device, idx, -h / 2.0)?;
                difference(&forward, &backward, h)
            }
            other => Err(GradError::UnsupportedOrder(other)),
        }
    }

    /// Analytic derivative with respect to global parameter `idx`, computed
    /// by the configured backend from a fresh state.
    pub fn analytic_pd(
        &mut self,
        tape: &Tape,
        device: &mut dyn Device,
        idx: usize,
    ) -> GradResult<Array1<f64>> {
        if let Some(rule) = self.analytic.as_mut() {
            rule.reset();
        }
        self.analytic_column(tape, device, idx)
    }

    /// The device's native Jacobian.
    pub fn device_pd(&self, tape: &mut Tape, device: &mut dyn Device) -> GradResult<Array2<f64>> {
        let jac = device.jacobian(tape)?;
        if jac.ncols() != tape.num_trainable() {
            return Err(GradError::ResultMismatch(format!(
                "device Jacobian has {} columns for {} trainable parameters",
                jac.ncols(),
                tape.num_trainable()
            )));
        }
        correct_output_dim(tape, jac.nrows());
        Ok(jac)
    }

    fn analytic_column(
        &mut self,
        tape: &Tape,
        device: &mut dyn Device,
        idx: usize,
    ) -> GradResult<Array1<f64>> {
        let rule = self
            .analytic
            .as_mut()
            .ok_or(GradError::NonDifferentiableParameter { params: vec![idx] })?;
        rule.partial(tape, device, idx)
    }

    // =========================================================================
    // Jacobian
    // =========================================================================

    /// Compute the Jacobian of the flattened tape output with respect to the
    /// trainable parameters, shape `(output_dim, num_trainable)`.
    #[instrument(skip(self, tape, device, options), fields(method = %options.method))]
    pub fn jacobian(
        &mut self,
        tape: &mut Tape,
        device: &mut dyn Device,
        options: &JacobianOptions,
    ) -> GradResult<Array2<f64>> {
        if !matches!(options.order, 1 | 2) {
            return Err(GradError::UnsupportedOrder(options.order));
        }
        with_overrides(tape, options.params.as_deref(), |tape| {
            self.assemble(tape, device, options)
        })
    }

    fn assemble(
        &mut self,
        tape: &mut Tape,
        device: &mut dyn Device,
        options: &JacobianOptions,
    ) -> GradResult<Array2<f64>> {
        self.update_gradient_info(tape);
        let trainable: Vec<usize> = tape.trainable_params().iter().copied().collect();
        if trainable.is_empty() {
            debug!("No trainable parameters, returning an empty Jacobian");
            return Ok(Array2::zeros((tape.output_dim(), 0)));
        }
        if options.method == DiffMethod::Device {
            return self.device_pd(tape, device);
        }

        let methods = self.column_methods(tape, &trainable, options.method)?;
        debug!(
            "Jacobian of {} trainable parameters: {}",
            trainable.len(),
            methods.iter().map(ToString::to_string).collect::<String>()
        );
        if let Some(rule) = self.analytic.as_mut() {
            rule.reset();
        }

        let mut y0: Option<Array1<f64>> = None;
        let mut columns = Vec::with_capacity(trainable.len());
        for (&idx, method) in trainable.iter().zip(methods) {
            let column = match method {
                GradMethod::Zero => None,
                GradMethod::FiniteDiff => {
                    if options.order == 1 && y0.is_none() {
                        y0 = Some(execute_flat(tape, device, None)?);
                    }
                    Some(self.numeric_pd(tape, device, idx, y0.as_ref(), options.order, options.h)?)
                }
                GradMethod::Analytic => Some(self.analytic_column(tape, device, idx)?),
            };
            columns.push(column);
        }

        let dim = columns
            .iter()
            .flatten()
            .map(Array1::len)
            .next()
            .unwrap_or_else(|| tape.output_dim());
        if let Some(bad) = columns.iter().flatten().find(|c| c.len() != dim) {
            return Err(GradError::ResultMismatch(format!(
                "Jacobian columns of length {} and {}",
                dim,
                bad.len()
            )));
        }
        correct_output_dim(tape, dim);

        let mut jac = Array2::zeros((dim, trainable.len()));
        for (j, column) in columns.iter().enumerate() {
            if let Some(column) = column {
                jac.column_mut(j).assign(column);
            }
        }
        Ok(jac)
    }

    /// Resolve the method of every trainable parameter for `method`.
    fn column_methods(
        &self,
        tape: &Tape,
        trainable: &[usize],
        method: DiffMethod,
    ) -> GradResult<Vec<GradMethod>> {
        let tags: Vec<Option<GradMethod>> = trainable
            .iter()
            .map(|&idx| tape.par_info()[idx].grad_method)
            .collect();

        let offending: Vec<usize> = trainable
            .iter()
            .zip(&tags)
            .filter(|(_, tag)| match method {
                DiffMethod::Analytic => tag.is_none_or(|t| t == GradMethod::FiniteDiff),
                _ => tag.is_none(),
            })
            .map(|(&idx, _)| idx)
            .collect();
        if !offending.is_empty() {
            return Err(GradError::NonDifferentiableParameter { params: offending });
        }

        Ok(tags
            .into_iter()
            .flatten()
            .map(|tag| match method {
                DiffMethod::Numeric => GradMethod::FiniteDiff,
                _ => tag,
            })
            .collect())
    }
}

fn difference(y: &Array1<f64>, y0: &Array1<f64>, h: f64) -> GradResult<Array1<f64>> {
    if y.len() != y0.len() {
        return Err(GradError::ResultMismatch(format!(
            "shifted evaluation returned {} values, baseline {}",
            y.len(),
            y0.len()
        )));
    }
    Ok((y - y0) / h)
}

fn correct_output_dim(tape: &mut Tape, dim: usize) {
    if dim != tape.output_dim() {
        debug!(
            "Output dimension estimate {} corrected to {}",
            tape.output_dim(),
            dim
        );
        tape.set_output_dim(dim);
    }
}

/// Find the operation owning global parameter `idx`.
///
/// Returns its position in [`Tape::flat_operations`], a copy of the operation
/// and the parameter's index within it.
pub(crate) fn locate(tape: &Tape, idx: usize) -> Option<(usize, Operation, usize)> {
    let mut offset = 0;
    let mut position = 0;
    locate_in(tape, idx, &mut offset, &mut position)
}

fn locate_in(
    tape: &Tape,
    idx: usize,
    offset: &mut usize,
    position: &mut usize,
) -> Option<(usize, Operation, usize)> {
    for instr in tape.operations() {
        match instr {
            Instruction::Op(op) => {
                let n = op.params().len();
                if idx < *offset + n {
                    return Some((*position, op.clone(), idx - *offset));
                }
                *offset += n;
                *position += 1;
            }
            Instruction::Tape(inner) => {
                let end = *offset + inner.num_params();
                if idx < end {
                    return locate_in(inner, idx, offset, position);
                }
                *offset = end;
                *position += inner.flat_operations().len();
            }
        }
    }
    None
}
