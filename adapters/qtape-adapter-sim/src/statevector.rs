//! Statevector simulation engine.
//!
//! Amplitudes are stored flat. The wire at position `p` of an `n`-wire state
//! is bit `n - 1 - p` of the basis index, so position 0 is the most
//! significant bit and a `[2; n]` tensor view in row-major order has axis `p`
//! for position `p`.

use ndarray::{Array2, ArrayD, IxDyn};
use num_complex::Complex64;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use qtape_hal::{HalError, HalResult};
use qtape_ir::{OpKind, Operation, Param};

/// Tolerance for the normalization check of prepared states.
const NORM_TOL: f64 = 1e-10;

/// A statevector representing a quantum state.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Create a statevector from explicit amplitudes.
    pub fn from_amplitudes(amplitudes: Vec<Complex64>, num_qubits: usize) -> HalResult<Self> {
        if amplitudes.len() != 1 << num_qubits {
            return Err(HalError::InvalidState(format!(
                "expected {} amplitudes for {} wires, got {}",
                1usize << num_qubits,
                num_qubits,
                amplitudes.len()
            )));
        }
        Ok(Self {
            amplitudes,
            num_qubits,
        })
    }

    /// Create a statevector from a `[2; n]` tensor.
    pub fn from_tensor(tensor: &ArrayD<Complex64>) -> HalResult<Self> {
        if tensor.shape().iter().any(|&d| d != 2) {
            return Err(HalError::InvalidState(format!(
                "expected a tensor of shape [2; n], got {:?}",
                tensor.shape()
            )));
        }
        Self::from_amplitudes(tensor.iter().copied().collect(), tensor.ndim())
    }

    /// View the state as a `[2; n]` tensor.
    pub fn to_tensor(&self) -> ArrayD<Complex64> {
        ArrayD::from_shape_vec(IxDyn(&vec![2; self.num_qubits]), self.amplitudes.clone())
            .unwrap_or_else(|_| unreachable!("amplitude count is always 2^n"))
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Get the amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    #[inline]
    fn mask(&self, position: usize) -> usize {
        1 << (self.num_qubits - 1 - position)
    }

    /// Apply an operation acting on the given wire positions.
    pub fn apply(&mut self, op: &Operation, positions: &[usize]) -> HalResult<()> {
        if let Some(&bad) = positions.iter().find(|&&p| p >= self.num_qubits) {
            return Err(HalError::InvalidState(format!(
                "wire position {bad} out of range for {} wires",
                self.num_qubits
            )));
        }
        match (op.kind(), op.params().first()) {
            (OpKind::BasisState, Some(Param::Bits(bits))) => self.prepare_basis_state(bits, positions),
            (OpKind::QubitStateVector, Some(Param::Vector(psi))) => {
                self.prepare_state(&psi.to_vec(), positions)
            }
            (OpKind::PauliX, _) => {
                self.apply_x(positions[0]);
                Ok(())
            }
            (OpKind::CNOT, _) => {
                self.apply_cx(positions[0], positions[1]);
                Ok(())
            }
            (OpKind::CZ, _) => {
                self.apply_cz(positions[0], positions[1]);
                Ok(())
            }
            (OpKind::RZ, Some(Param::Real(theta))) => {
                let theta = if op.is_inverse() { -theta } else { *theta };
                self.apply_rz(positions[0], theta);
                Ok(())
            }
            (OpKind::PhaseShift, Some(Param::Real(phi))) => {
                let phi = if op.is_inverse() { -phi } else { *phi };
                self.apply_phase(positions[0], phi);
                Ok(())
            }
            _ => {
                let matrix = op
                    .matrix()
                    .ok_or_else(|| HalError::UnsupportedOperation(op.name().to_string()))?;
                self.apply_matrix(&matrix, positions)
            }
        }
    }

    // =========================================================================
    // State preparation
    // =========================================================================

    fn prepare_basis_state(&mut self, bits: &[u8], positions: &[usize]) -> HalResult<()> {
        if bits.len() != positions.len() || bits.iter().any(|&b| b > 1) {
            return Err(HalError::InvalidState(format!(
                "basis state {bits:?} does not match {} wires",
                positions.len()
            )));
        }
        let index = bits
            .iter()
            .zip(positions)
            .filter(|(bit, _)| **bit == 1)
            .fold(0, |acc, (_, &p)| acc | self.mask(p));
        self.amplitudes.fill(Complex64::new(0.0, 0.0));
        self.amplitudes[index] = Complex64::new(1.0, 0.0);
        Ok(())
    }

    fn prepare_state(&mut self, psi: &[Complex64], positions: &[usize]) -> HalResult<()> {
        if psi.len() != 1 << positions.len() {
            return Err(HalError::InvalidState(format!(
                "state of length {} does not match {} wires",
                psi.len(),
                positions.len()
            )));
        }
        let norm: f64 = psi.iter().map(Complex64::norm_sqr).sum();
        if (norm - 1.0).abs() > NORM_TOL {
            return Err(HalError::InvalidState(format!(
                "state vector must have norm 1, got {}",
                norm.sqrt()
            )));
        }
        let masks: Vec<usize> = positions.iter().map(|&p| self.mask(p)).collect();
        self.amplitudes.fill(Complex64::new(0.0, 0.0));
        for (k, amp) in psi.iter().enumerate() {
            self.amplitudes[scatter(k, &masks)] = *amp;
        }
        Ok(())
    }

    // =========================================================================
    // Gate kernels
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = self.mask(qubit);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = self.mask(qubit);
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = self.mask(qubit);
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                self.amplitudes[i] *= phase_0;
            } else {
                self.amplitudes[i] *= phase_1;
            }
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = self.mask(control);
        let tgt_mask = self.mask(target);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let ctrl_mask = self.mask(control);
        let tgt_mask = self.mask(target);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    /// Apply a `2^k × 2^k` matrix to `k` wire positions; the first position is
    /// the most significant bit of the matrix index.
    pub fn apply_matrix(&mut self, matrix: &Array2<Complex64>, positions: &[usize]) -> HalResult<()> {
        let dim = 1 << positions.len();
        if matrix.nrows() != dim || matrix.ncols() != dim {
            return Err(HalError::InvalidState(format!(
                "matrix of shape {:?} cannot act on {} wires",
                matrix.shape(),
                positions.len()
            )));
        }
        if let [qubit] = positions {
            self.apply_single(matrix, *qubit);
            return Ok(());
        }

        let masks: Vec<usize> = positions.iter().map(|&p| self.mask(p)).collect();
        let all: usize = masks.iter().fold(0, |acc, m| acc | m);
        let offsets: Vec<usize> = (0..dim).map(|k| scatter(k, &masks)).collect();
        let mut local = vec![Complex64::new(0.0, 0.0); dim];
        for base in 0..(1 << self.num_qubits) {
            if base & all != 0 {
                continue;
            }
            for (slot, off) in local.iter_mut().zip(&offsets) {
                *slot = self.amplitudes[base | off];
            }
            for (row, off) in offsets.iter().enumerate() {
                self.amplitudes[base | off] = matrix
                    .row(row)
                    .iter()
                    .zip(&local)
                    .map(|(m, a)| m * a)
                    .sum();
            }
        }
        Ok(())
    }

    fn apply_single(&mut self, m: &Array2<Complex64>, qubit: usize) {
        let mask = self.mask(qubit);
        let (m00, m01, m10, m11) = (m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m00 * a + m01 * b;
                self.amplitudes[j] = m10 * a + m11 * b;
            }
        }
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    /// Marginal probabilities of the basis states of the given positions; the
    /// first position is the most significant bit of the result index.
    pub fn probabilities(&self, positions: &[usize]) -> Vec<f64> {
        let masks: Vec<usize> = positions.iter().map(|&p| self.mask(p)).collect();
        let mut probs = vec![0.0; 1 << positions.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            probs[gather(i, &masks)] += amp.norm_sqr();
        }
        probs
    }

    /// Draw `shots` outcome indices from a probability distribution.
    pub fn sample_indices<R: Rng>(probs: &[f64], shots: usize, rng: &mut R) -> HalResult<Vec<usize>> {
        let dist = WeightedIndex::new(probs)
            .map_err(|e| HalError::InvalidState(format!("cannot sample: {e}")))?;
        Ok((0..shots).map(|_| dist.sample(rng)).collect())
    }
}

/// Spread the bits of `k` (most significant first) onto `masks`.
fn scatter(k: usize, masks: &[usize]) -> usize {
    let n = masks.len();
    masks
        .iter()
        .enumerate()
        .filter(|(b, _)| k & (1 << (n - 1 - b)) != 0)
        .fold(0, |acc, (_, m)| acc | m)
}

/// Collect the bits of `i` selected by `masks` into a compact index.
fn gather(i: usize, masks: &[usize]) -> usize {
    masks
        .iter()
        .fold(0, |acc, m| (acc << 1) | usize::from(i & m != 0))
}
