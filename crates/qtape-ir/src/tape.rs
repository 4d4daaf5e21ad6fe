//! The quantum tape: a recorded circuit with a global parameter table.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::graph::CircuitGraph;
use crate::instruction::Instruction;
use crate::measurement::{Measurement, ReturnKind};
use crate::observable::Observable;
use crate::operation::Operation;
use crate::param::Param;
use crate::recorder::Recorder;
use crate::wire::{Wire, unique_wires};

/// Where a global parameter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamOwner {
    /// Entry `i` of the tape's operation list (preparations included).
    Op(usize),
    /// The observable of measurement `i`.
    Observable(usize),
}

/// How the derivative with respect to a parameter is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradMethod {
    /// Analytic rule ("A").
    Analytic,
    /// Finite differences ("F").
    FiniteDiff,
    /// Structurally zero ("0").
    Zero,
}

impl fmt::Display for GradMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradMethod::Analytic => "A",
            GradMethod::FiniteDiff => "F",
            GradMethod::Zero => "0",
        };
        f.write_str(s)
    }
}

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Owning operation or observable.
    pub owner: ParamOwner,
    /// Index within the owner's parameter list.
    pub p_idx: usize,
    /// Inferred gradient method; `None` until inferred or if not differentiable.
    pub grad_method: Option<GradMethod>,
}

/// A recorded quantum circuit.
///
/// State preparations occupy a prefix of the operation list and are followed
/// by ordinary operations (or nested tapes); measurements come last. Every
/// parameter of every operation and observable gets a global index, assigned
/// in queue order and contiguous from zero.
///
/// Tapes are recorded through [`Tape::build`] or extended with
/// [`Tape::record`]:
///
/// ```ignore
/// let tape = Tape::build(|rec| {
///     rec.apply(Operation::rx(0.543, 0))
///         .apply(Operation::ry(-0.654, 1))
///         .apply(Operation::cnot(0, 1))
///         .expval(Observable::PauliZ(0.into()).tensor(Observable::PauliX(1.into())));
///     Ok(())
/// })?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tape {
    ops: Vec<Instruction>,
    num_prep: usize,
    measurements: Vec<Measurement>,
    par_info: Vec<ParameterInfo>,
    trainable: BTreeSet<usize>,
    graph: OnceCell<CircuitGraph>,
    output_dim: usize,
}

impl Tape {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new tape.
    ///
    /// The closure queues items through the recorder; the queue is validated
    /// when the closure returns.
    pub fn build<F>(f: F) -> IrResult<Self>
    where
        F: FnOnce(&mut Recorder) -> IrResult<()>,
    {
        let mut tape = Self::new();
        tape.record(f)?;
        Ok(tape)
    }

    /// Re-enter this tape and append further items.
    ///
    /// On error the tape is left unchanged. On success the parameter table is
    /// rebuilt and every parameter becomes trainable.
    pub fn record<F>(&mut self, f: F) -> IrResult<()>
    where
        F: FnOnce(&mut Recorder) -> IrResult<()>,
    {
        let mut rec = Recorder::new();
        f(&mut rec)?;
        rec.commit(self)
    }

    /// Replace the contents of this tape and rebuild all derived state.
    pub(crate) fn install(
        &mut self,
        prep: Vec<Instruction>,
        ops: Vec<Instruction>,
        measurements: Vec<Measurement>,
    ) {
        self.num_prep = prep.len();
        self.ops = prep;
        self.ops.extend(ops);
        self.measurements = measurements;
        self.rebuild_par_info();
        self.trainable = (0..self.par_info.len()).collect();
        self.output_dim = self
            .measurements
            .iter()
            .map(Measurement::output_dim_estimate)
            .sum();
        self.graph = OnceCell::new();
    }

    fn rebuild_par_info(&mut self) {
        let mut info = Vec::new();
        for (i, instr) in self.ops.iter().enumerate() {
            for p_idx in 0..instr.num_params() {
                info.push(ParameterInfo {
                    owner: ParamOwner::Op(i),
                    p_idx,
                    grad_method: None,
                });
            }
        }
        for (i, m) in self.measurements.iter().enumerate() {
            let n = m.observable().map_or(0, Observable::num_params);
            for p_idx in 0..n {
                info.push(ParameterInfo {
                    owner: ParamOwner::Observable(i),
                    p_idx,
                    grad_method: None,
                });
            }
        }
        self.par_info = info;
    }

    // =========================================================================
    // Parameter table
    // =========================================================================

    /// Total number of parameters, trainable or not.
    #[inline]
    pub fn num_params(&self) -> usize {
        self.par_info.len()
    }

    /// Number of trainable parameters.
    #[inline]
    pub fn num_trainable(&self) -> usize {
        self.trainable.len()
    }

    /// Global indices of the trainable parameters, ascending.
    #[inline]
    pub fn trainable_params(&self) -> &BTreeSet<usize> {
        &self.trainable
    }

    /// Set which parameters are trainable.
    pub fn set_trainable_params(&mut self, indices: impl IntoIterator<Item = usize>) -> IrResult<()> {
        let indices: BTreeSet<usize> = indices.into_iter().collect();
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.par_info.len()) {
            return Err(IrError::ParameterIndex {
                index: bad,
                num_params: self.par_info.len(),
            });
        }
        self.trainable = indices;
        Ok(())
    }

    /// The parameter table, indexed by global parameter index.
    #[inline]
    pub fn par_info(&self) -> &[ParameterInfo] {
        &self.par_info
    }

    /// Store an inferred gradient method for a parameter.
    pub fn set_grad_method(&mut self, idx: usize, method: Option<GradMethod>) {
        if let Some(info) = self.par_info.get_mut(idx) {
            info.grad_method = method;
        }
    }

    /// Current value of the parameter with global index `idx`.
    pub fn parameter(&self, idx: usize) -> Option<Param> {
        let info = self.par_info.get(idx)?;
        match info.owner {
            ParamOwner::Op(i) => self.ops.get(i)?.parameter(info.p_idx),
            ParamOwner::Observable(i) => self
                .measurements
                .get(i)?
                .observable()?
                .parameters()
                .into_iter()
                .nth(info.p_idx),
        }
    }

    pub(crate) fn set_parameter(&mut self, idx: usize, value: Param) {
        let Some(info) = self.par_info.get(idx) else {
            return;
        };
        let p_idx = info.p_idx;
        match info.owner {
            ParamOwner::Op(i) => self.ops[i].set_parameter(p_idx, value),
            ParamOwner::Observable(i) => {
                if let Some(obs) = self.measurements[i].observable_mut() {
                    obs.set_param(p_idx, value);
                }
            }
        }
    }

    /// Current parameter values in ascending global-index order.
    pub fn get_parameters(&self, trainable_only: bool) -> Vec<Param> {
        self.parameter_indices(trainable_only)
            .filter_map(|idx| self.parameter(idx))
            .collect()
    }

    /// Write parameter values back into their owners.
    ///
    /// With `trainable_only` the values are matched against the trainable
    /// parameters in ascending order, otherwise against all parameters.
    pub fn set_parameters(&mut self, values: Vec<Param>, trainable_only: bool) -> IrResult<()> {
        let indices: Vec<usize> = self.parameter_indices(trainable_only).collect();
        if values.len() != indices.len() {
            return Err(IrError::ParameterCountMismatch {
                expected: indices.len(),
                got: values.len(),
            });
        }
        for (idx, value) in indices.into_iter().zip(values) {
            self.set_parameter(idx, value);
        }
        Ok(())
    }

    fn parameter_indices(&self, trainable_only: bool) -> Box<dyn Iterator<Item = usize> + '_> {
        if trainable_only {
            Box::new(self.trainable.iter().copied())
        } else {
            Box::new(0..self.par_info.len())
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// All operation entries, state preparations first.
    #[inline]
    pub fn operations(&self) -> &[Instruction] {
        &self.ops
    }

    /// Alias of [`operations`](Self::operations).
    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.ops
    }

    /// The state-preparation prefix.
    #[inline]
    pub fn prep(&self) -> &[Instruction] {
        &self.ops[..self.num_prep]
    }

    /// Number of state preparations.
    #[inline]
    pub fn num_prep(&self) -> usize {
        self.num_prep
    }

    /// All operations with nested tapes flattened.
    pub fn flat_operations(&self) -> Vec<Operation> {
        let mut out = Vec::with_capacity(self.ops.len());
        for instr in &self.ops {
            instr.flatten_into(&mut out);
        }
        out
    }

    /// The measurements, in queue order.
    #[inline]
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Observables of all observable-based measurements.
    pub fn observables(&self) -> impl Iterator<Item = &Observable> {
        self.measurements.iter().filter_map(Measurement::observable)
    }

    /// Wires used by the tape, in first-appearance order.
    pub fn wires(&self) -> Vec<Wire> {
        let op_wires = self.ops.iter().flat_map(Instruction::wires);
        let m_wires = self.measurements.iter().flat_map(|m| m.wires().iter().cloned());
        let all: Vec<Wire> = op_wires.chain(m_wires).collect();
        unique_wires(&all)
    }

    /// Number of distinct wires.
    pub fn num_wires(&self) -> usize {
        self.wires().len()
    }

    /// Gates rotating every observable into the computational basis.
    pub fn diagonalizing_gates(&self) -> IrResult<Vec<Operation>> {
        let mut gates = Vec::new();
        for obs in self.observables() {
            gates.extend(obs.diagonalizing_gates()?);
        }
        Ok(gates)
    }

    /// Check if any measurement returns samples.
    pub fn is_sampled(&self) -> bool {
        self.measurements
            .iter()
            .any(|m| m.kind() == ReturnKind::Sample)
    }

    /// Estimated length of the flattened result vector.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Overwrite the output-dimension estimate.
    pub fn set_output_dim(&mut self, dim: usize) {
        self.output_dim = dim;
    }

    /// The dependency graph, built on first access.
    pub fn graph(&self) -> &CircuitGraph {
        self.graph.get_or_init(|| CircuitGraph::build(self))
    }

    /// Check if the dependency graph has been built and cached.
    pub fn has_graph(&self) -> bool {
        self.graph.get().is_some()
    }

    // =========================================================================
    // Inversion
    // =========================================================================

    /// Invert the tape in place.
    ///
    /// Non-preparation operations are reversed and each is inverted; state
    /// preparations (including nested tapes that prepare a state) and
    /// measurements stay where they are. Parameter indices
    /// move with their owners, so the trainable set keeps the same values.
    pub fn inv(&mut self) {
        self.invert_in_place();
    }

    /// Invert and return the old-to-new global index map.
    fn invert_in_place(&mut self) -> Vec<usize> {
        let num_prep = self.num_prep;
        let local_maps: Vec<Vec<usize>> = self
            .ops
            .iter_mut()
            .enumerate()
            .map(|(i, instr)| match instr {
                Instruction::Op(op) => {
                    if i >= num_prep {
                        op.invert();
                    }
                    (0..op.params().len()).collect()
                }
                Instruction::Tape(inner) if i >= num_prep => inner.invert_in_place(),
                Instruction::Tape(inner) => (0..inner.num_params()).collect(),
            })
            .collect();

        let mut old_start = Vec::with_capacity(local_maps.len());
        let mut next = 0;
        for map in &local_maps {
            old_start.push(next);
            next += map.len();
        }

        let mut remap: Vec<usize> = (0..self.par_info.len()).collect();
        let order = (0..num_prep).chain((num_prep..self.ops.len()).rev());
        let mut new_start = 0;
        for old in order {
            for (p, &q) in local_maps[old].iter().enumerate() {
                remap[old_start[old] + p] = new_start + q;
            }
            new_start += local_maps[old].len();
        }

        self.ops[num_prep..].reverse();
        self.trainable = self.trainable.iter().map(|&idx| remap[idx]).collect();
        self.rebuild_par_info();
        self.graph = OnceCell::new();
        remap
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wires: Vec<String> = self.wires().iter().map(ToString::to_string).collect();
        writeln!(
            f,
            "Tape(wires=[{}], params={}, trainable={})",
            wires.join(", "),
            self.num_params(),
            self.num_trainable()
        )?;
        for instr in &self.ops {
            writeln!(f, "  {instr}")?;
        }
        for m in &self.measurements {
            writeln!(f, "  {m}")?;
        }
        Ok(())
    }
}
