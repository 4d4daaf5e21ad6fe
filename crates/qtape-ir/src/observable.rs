//! Observables and their diagonalization.

use faer::{Mat, Side};
use ndarray::{Array1, Array2, array};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::operation::{Operation, adjoint};
use crate::param::Param;
use crate::wire::Wire;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Tolerance used when separating degenerate eigenvectors.
const EIG_TOL: f64 = 1e-8;

/// A Hermitian quantity that can be measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observable {
    /// Pauli-X on one wire.
    PauliX(Wire),
    /// Pauli-Y on one wire.
    PauliY(Wire),
    /// Pauli-Z on one wire.
    PauliZ(Wire),
    /// Hadamard on one wire.
    Hadamard(Wire),
    /// Identity on one wire.
    Identity(Wire),
    /// An arbitrary Hermitian matrix over `wires`.
    Hermitian {
        /// The matrix, `2^n × 2^n` for `n` wires.
        matrix: Array2<Complex64>,
        /// Wires the matrix acts on, first wire most significant.
        wires: Vec<Wire>,
    },
    /// Tensor product of observables on disjoint wires.
    Tensor(Vec<Observable>),
}

impl Observable {
    /// Create a Hermitian observable, checking the matrix dimension.
    pub fn hermitian(
        matrix: Array2<Complex64>,
        wires: impl IntoIterator<Item = impl Into<Wire>>,
    ) -> IrResult<Self> {
        let wires: Vec<Wire> = wires.into_iter().map(Into::into).collect();
        let dim = 1usize << wires.len();
        if matrix.nrows() != dim || matrix.ncols() != dim {
            return Err(IrError::WireCountMismatch {
                name: "Hermitian".to_string(),
                expected: matrix.nrows().trailing_zeros() as usize,
                got: wires.len(),
            });
        }
        Ok(Observable::Hermitian { matrix, wires })
    }

    /// Form the tensor product `self ⊗ other`, flattening nested products.
    #[must_use]
    pub fn tensor(self, other: Observable) -> Observable {
        let mut factors = match self {
            Observable::Tensor(f) => f,
            single => vec![single],
        };
        match other {
            Observable::Tensor(f) => factors.extend(f),
            single => factors.push(single),
        }
        Observable::Tensor(factors)
    }

    /// Name of this observable; tensor products join factor names with `@`.
    pub fn name(&self) -> String {
        match self {
            Observable::PauliX(_) => "PauliX".into(),
            Observable::PauliY(_) => "PauliY".into(),
            Observable::PauliZ(_) => "PauliZ".into(),
            Observable::Hadamard(_) => "Hadamard".into(),
            Observable::Identity(_) => "Identity".into(),
            Observable::Hermitian { .. } => "Hermitian".into(),
            Observable::Tensor(factors) => factors
                .iter()
                .map(Observable::name)
                .collect::<Vec<_>>()
                .join(" @ "),
        }
    }

    /// Tensor factors of this observable; a non-product observable is its own
    /// single factor.
    pub fn factors(&self) -> Vec<&Observable> {
        match self {
            Observable::Tensor(factors) => factors.iter().flat_map(Observable::factors).collect(),
            single => vec![single],
        }
    }

    /// Wires this observable acts on.
    pub fn wires(&self) -> Vec<Wire> {
        match self {
            Observable::PauliX(w)
            | Observable::PauliY(w)
            | Observable::PauliZ(w)
            | Observable::Hadamard(w)
            | Observable::Identity(w) => vec![w.clone()],
            Observable::Hermitian { wires, .. } => wires.clone(),
            Observable::Tensor(factors) => factors.iter().flat_map(Observable::wires).collect(),
        }
    }

    /// Parameters of this observable, in declaration order.
    pub fn parameters(&self) -> Vec<Param> {
        match self {
            Observable::Hermitian { matrix, .. } => vec![Param::Matrix(matrix.clone())],
            Observable::Tensor(factors) => factors.iter().flat_map(Observable::parameters).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of parameters.
    pub fn num_params(&self) -> usize {
        match self {
            Observable::Hermitian { .. } => 1,
            Observable::Tensor(factors) => factors.iter().map(Observable::num_params).sum(),
            _ => 0,
        }
    }

    /// Overwrite the parameter at `local` index. Non-matrix values are ignored.
    pub fn set_param(&mut self, local: usize, value: Param) {
        match self {
            Observable::Hermitian { matrix, .. } => {
                if let (0, Param::Matrix(m)) = (local, value) {
                    *matrix = m;
                }
            }
            Observable::Tensor(factors) => {
                let mut offset = local;
                for factor in factors {
                    let n = factor.num_params();
                    if offset < n {
                        factor.set_param(offset, value);
                        return;
                    }
                    offset -= n;
                }
            }
            _ => {}
        }
    }

    /// Check if the observable is already diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        match self {
            Observable::PauliZ(_) | Observable::Identity(_) => true,
            Observable::Tensor(factors) => factors.iter().all(Observable::is_diagonal),
            _ => false,
        }
    }

    /// Matrix representation, first wire most significant.
    pub fn matrix(&self) -> Array2<Complex64> {
        let i = Complex64::new(0.0, 1.0);
        match self {
            Observable::PauliX(_) => array![[ZERO, ONE], [ONE, ZERO]],
            Observable::PauliY(_) => array![[ZERO, -i], [i, ZERO]],
            Observable::PauliZ(_) => array![[ONE, ZERO], [ZERO, -ONE]],
            Observable::Hadamard(_) => {
                let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
                array![[h, h], [h, -h]]
            }
            Observable::Identity(_) => Array2::eye(2),
            Observable::Hermitian { matrix, .. } => matrix.clone(),
            Observable::Tensor(factors) => factors
                .iter()
                .map(Observable::matrix)
                .fold(Array2::eye(1), |acc, m| ndarray::linalg::kron(&acc, &m)),
        }
    }

    /// Eigenvalues in the order that matches computational basis states after
    /// [`diagonalizing_gates`](Self::diagonalizing_gates) are applied.
    pub fn eigvals(&self) -> IrResult<Array1<f64>> {
        match self {
            Observable::PauliX(_)
            | Observable::PauliY(_)
            | Observable::PauliZ(_)
            | Observable::Hadamard(_) => Ok(ndarray::arr1(&[1.0, -1.0])),
            Observable::Identity(_) => Ok(ndarray::arr1(&[1.0, 1.0])),
            Observable::Hermitian { matrix, .. } => Ok(hermitian_eigh(matrix)?.0),
            Observable::Tensor(factors) => {
                let mut out = ndarray::arr1(&[1.0]);
                for factor in factors {
                    let ev = factor.eigvals()?;
                    out = out
                        .iter()
                        .flat_map(|a| ev.iter().map(move |b| a * b))
                        .collect();
                }
                Ok(out)
            }
        }
    }

    /// Operations that rotate this observable into the computational basis.
    pub fn diagonalizing_gates(&self) -> IrResult<Vec<Operation>> {
        Ok(match self {
            Observable::PauliX(w) => vec![Operation::hadamard(w.clone())],
            Observable::PauliY(w) => vec![
                Operation::pauli_z(w.clone()),
                Operation::s(w.clone()),
                Operation::hadamard(w.clone()),
            ],
            Observable::PauliZ(_) | Observable::Identity(_) => Vec::new(),
            Observable::Hadamard(w) => vec![Operation::ry(-FRAC_PI_4, w.clone())],
            Observable::Hermitian { matrix, wires } => {
                let (_, u) = hermitian_eigh(matrix)?;
                vec![Operation::qubit_unitary(adjoint(&u), wires.iter().cloned())?]
            }
            Observable::Tensor(factors) => {
                let mut gates = Vec::new();
                for factor in factors {
                    gates.extend(factor.diagonalizing_gates()?);
                }
                gates
            }
        })
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wires: Vec<String> = self.wires().iter().map(ToString::to_string).collect();
        write!(f, "{}(wires=[{}])", self.name(), wires.join(", "))
    }
}

/// Eigen-decompose a Hermitian matrix.
///
/// Returns ascending eigenvalues and the unitary whose columns are the
/// corresponding eigenvectors. The complex problem `H = A + iB` is solved via
/// the real symmetric embedding `[[A, -B], [B, A]]`, whose spectrum is that of
/// `H` with every eigenvalue doubled; one eigenvector per copy is recovered by
/// Gram-Schmidt against those already chosen.
pub fn hermitian_eigh(h: &Array2<Complex64>) -> IrResult<(Array1<f64>, Array2<Complex64>)> {
    let n = h.nrows();
    if n == 0 || h.ncols() != n {
        return Err(IrError::Linalg(format!(
            "expected a non-empty square matrix, got {}x{}",
            h.nrows(),
            h.ncols()
        )));
    }
    let embedded = Mat::<f64>::from_fn(2 * n, 2 * n, |r, c| {
        let z = h[(r % n, c % n)];
        match (r < n, c < n) {
            (true, true) | (false, false) => z.re,
            (true, false) => -z.im,
            (false, true) => z.im,
        }
    });
    let evd = embedded
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| IrError::Linalg(format!("{e:?}")))?;
    let s = evd.S().column_vector();
    let u = evd.U();

    let mut values = Vec::with_capacity(n);
    let mut vectors: Vec<Array1<Complex64>> = Vec::with_capacity(n);
    for k in 0..2 * n {
        if vectors.len() == n {
            break;
        }
        let mut v: Array1<Complex64> =
            (0..n).map(|r| Complex64::new(u[(r, k)], u[(r + n, k)])).collect();
        for prev in &vectors {
            let overlap: Complex64 = prev.iter().zip(v.iter()).map(|(p, x)| p.conj() * x).sum();
            v = &v - &prev.mapv(|p| p * overlap);
        }
        let norm = v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
        if norm > EIG_TOL {
            vectors.push(v.mapv(|x| x / norm));
            values.push(s[k]);
        }
    }
    if vectors.len() != n {
        return Err(IrError::Linalg(format!(
            "recovered {} of {n} eigenvectors",
            vectors.len()
        )));
    }

    let mut unitary = Array2::zeros((n, n));
    for (col, vec) in vectors.iter().enumerate() {
        unitary.column_mut(col).assign(vec);
    }
    Ok((Array1::from(values), unitary))
}
