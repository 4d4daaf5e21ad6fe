//! Operation catalog.
//!
//! Every operation kind is a variant of the closed [`OpKind`] enum. Matrices,
//! decompositions and generators are resolved by matching on the kind, so
//! adding a gate means adding a variant and filling in the tables below.

use ndarray::{Array2, array};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4, PI};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::param::Param;
use crate::wire::Wire;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// The kinds of operation a tape can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    // Parametrized single-qubit rotations
    /// Rotation around X.
    RX,
    /// Rotation around Y.
    RY,
    /// Rotation around Z.
    RZ,
    /// Arbitrary rotation RZ(ω)·RY(θ)·RZ(φ).
    Rot,
    /// Phase shift diag(1, e^{iφ}).
    PhaseShift,
    /// Universal single-qubit gate U3(θ, φ, λ).
    U3,

    // Fixed single-qubit gates
    /// Pauli-X.
    PauliX,
    /// Pauli-Y.
    PauliY,
    /// Pauli-Z.
    PauliZ,
    /// Hadamard.
    Hadamard,
    /// S gate.
    S,
    /// T gate.
    T,

    // Two-qubit gates
    /// Controlled-NOT.
    CNOT,
    /// Controlled-Z.
    CZ,

    // Matrix-valued and state preparation
    /// Arbitrary unitary given as a matrix parameter.
    QubitUnitary,
    /// Computational basis state preparation.
    BasisState,
    /// Arbitrary state vector preparation.
    QubitStateVector,
}

impl OpKind {
    /// Get the name of this operation kind.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::RX => "RX",
            OpKind::RY => "RY",
            OpKind::RZ => "RZ",
            OpKind::Rot => "Rot",
            OpKind::PhaseShift => "PhaseShift",
            OpKind::U3 => "U3",
            OpKind::PauliX => "PauliX",
            OpKind::PauliY => "PauliY",
            OpKind::PauliZ => "PauliZ",
            OpKind::Hadamard => "Hadamard",
            OpKind::S => "S",
            OpKind::T => "T",
            OpKind::CNOT => "CNOT",
            OpKind::CZ => "CZ",
            OpKind::QubitUnitary => "QubitUnitary",
            OpKind::BasisState => "BasisState",
            OpKind::QubitStateVector => "QubitStateVector",
        }
    }

    /// Number of parameters this kind takes.
    pub fn num_params(&self) -> usize {
        match self {
            OpKind::RX | OpKind::RY | OpKind::RZ | OpKind::PhaseShift => 1,
            OpKind::Rot | OpKind::U3 => 3,
            OpKind::QubitUnitary | OpKind::BasisState | OpKind::QubitStateVector => 1,
            _ => 0,
        }
    }

    /// Number of wires, if fixed by the kind.
    ///
    /// Matrix-valued operations and state preparations act on as many wires
    /// as their parameter requires and return `None`.
    pub fn num_wires(&self) -> Option<usize> {
        match self {
            OpKind::CNOT | OpKind::CZ => Some(2),
            OpKind::QubitUnitary | OpKind::BasisState | OpKind::QubitStateVector => None,
            _ => Some(1),
        }
    }

    /// Check if this kind prepares a state and must precede all other operations.
    #[inline]
    pub fn is_state_prep(&self) -> bool {
        matches!(self, OpKind::BasisState | OpKind::QubitStateVector)
    }

    /// Check if the parameters of this kind can be differentiated.
    pub fn is_differentiable(&self) -> bool {
        matches!(
            self,
            OpKind::RX | OpKind::RY | OpKind::RZ | OpKind::Rot | OpKind::PhaseShift | OpKind::U3
        )
    }

    /// All kinds in the catalog.
    pub fn all() -> &'static [OpKind] {
        &[
            OpKind::RX,
            OpKind::RY,
            OpKind::RZ,
            OpKind::Rot,
            OpKind::PhaseShift,
            OpKind::U3,
            OpKind::PauliX,
            OpKind::PauliY,
            OpKind::PauliZ,
            OpKind::Hadamard,
            OpKind::S,
            OpKind::T,
            OpKind::CNOT,
            OpKind::CZ,
            OpKind::QubitUnitary,
            OpKind::BasisState,
            OpKind::QubitStateVector,
        ]
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parametrized action on specific wires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    kind: OpKind,
    wires: Vec<Wire>,
    params: Vec<Param>,
    inverse: bool,
}

impl Operation {
    /// Create an operation, checking parameter and wire counts.
    pub fn new(
        kind: OpKind,
        params: Vec<Param>,
        wires: impl IntoIterator<Item = impl Into<Wire>>,
    ) -> IrResult<Self> {
        let wires: Vec<Wire> = wires.into_iter().map(Into::into).collect();
        if params.len() != kind.num_params() {
            return Err(IrError::OperationParamMismatch {
                name: kind.name().to_string(),
                expected: kind.num_params(),
                got: params.len(),
            });
        }
        let expected_wires = match (kind, params.first()) {
            (OpKind::QubitUnitary, Some(Param::Matrix(m))) => Some(m.nrows().trailing_zeros() as usize),
            (OpKind::BasisState, Some(Param::Bits(b))) => Some(b.len()),
            (OpKind::QubitStateVector, Some(Param::Vector(v))) => Some(v.len().trailing_zeros() as usize),
            _ => kind.num_wires(),
        };
        if let Some(expected) = expected_wires {
            if wires.len() != expected {
                return Err(IrError::WireCountMismatch {
                    name: kind.name().to_string(),
                    expected,
                    got: wires.len(),
                });
            }
        }
        Ok(Self::from_parts(kind, params, wires))
    }

    fn from_parts(kind: OpKind, params: Vec<Param>, wires: Vec<Wire>) -> Self {
        Self {
            kind,
            wires,
            params,
            inverse: false,
        }
    }

    fn single(kind: OpKind, params: Vec<Param>, wire: impl Into<Wire>) -> Self {
        Self::from_parts(kind, params, vec![wire.into()])
    }

    /// RX(θ).
    pub fn rx(theta: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::RX, vec![Param::Real(theta)], wire)
    }

    /// RY(θ).
    pub fn ry(theta: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::RY, vec![Param::Real(theta)], wire)
    }

    /// RZ(θ).
    pub fn rz(theta: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::RZ, vec![Param::Real(theta)], wire)
    }

    /// Rot(φ, θ, ω) = RZ(ω)·RY(θ)·RZ(φ).
    pub fn rot(phi: f64, theta: f64, omega: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::Rot, Param::reals(&[phi, theta, omega]), wire)
    }

    /// PhaseShift(φ).
    pub fn phase_shift(phi: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::PhaseShift, vec![Param::Real(phi)], wire)
    }

    /// U3(θ, φ, λ).
    pub fn u3(theta: f64, phi: f64, lambda: f64, wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::U3, Param::reals(&[theta, phi, lambda]), wire)
    }

    /// Pauli-X.
    pub fn pauli_x(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::PauliX, vec![], wire)
    }

    /// Pauli-Y.
    pub fn pauli_y(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::PauliY, vec![], wire)
    }

    /// Pauli-Z.
    pub fn pauli_z(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::PauliZ, vec![], wire)
    }

    /// Hadamard.
    pub fn hadamard(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::Hadamard, vec![], wire)
    }

    /// S gate.
    pub fn s(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::S, vec![], wire)
    }

    /// T gate.
    pub fn t(wire: impl Into<Wire>) -> Self {
        Self::single(OpKind::T, vec![], wire)
    }

    /// CNOT with `control` first.
    pub fn cnot(control: impl Into<Wire>, target: impl Into<Wire>) -> Self {
        Self::from_parts(OpKind::CNOT, vec![], vec![control.into(), target.into()])
    }

    /// Controlled-Z.
    pub fn cz(control: impl Into<Wire>, target: impl Into<Wire>) -> Self {
        Self::from_parts(OpKind::CZ, vec![], vec![control.into(), target.into()])
    }

    /// Arbitrary unitary on `wires`; the matrix must be `2^n × 2^n`.
    pub fn qubit_unitary(
        matrix: Array2<Complex64>,
        wires: impl IntoIterator<Item = impl Into<Wire>>,
    ) -> IrResult<Self> {
        Self::new(OpKind::QubitUnitary, vec![Param::Matrix(matrix)], wires)
    }

    /// Prepare the computational basis state `bits` on `wires`.
    pub fn basis_state(
        bits: Vec<u8>,
        wires: impl IntoIterator<Item = impl Into<Wire>>,
    ) -> IrResult<Self> {
        Self::new(OpKind::BasisState, vec![Param::Bits(bits)], wires)
    }

    /// Prepare the state with the given amplitudes on `wires`.
    pub fn qubit_state_vector(
        amplitudes: ndarray::Array1<Complex64>,
        wires: impl IntoIterator<Item = impl Into<Wire>>,
    ) -> IrResult<Self> {
        Self::new(OpKind::QubitStateVector, vec![Param::Vector(amplitudes)], wires)
    }

    /// Get the kind.
    #[inline]
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    /// Get the name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Get the wires.
    #[inline]
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Get the parameters.
    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Overwrite the parameter at `local` index.
    ///
    /// # Panics
    ///
    /// Panics if `local` is out of range for this operation.
    pub fn set_param(&mut self, local: usize, value: Param) {
        self.params[local] = value;
    }

    /// Check whether this operation is inverted.
    #[inline]
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Toggle the inverse flag in place.
    pub fn invert(&mut self) {
        self.inverse = !self.inverse;
    }

    /// Return this operation with its inverse flag toggled.
    #[must_use]
    pub fn inv(mut self) -> Self {
        self.invert();
        self
    }

    fn real(&self, idx: usize) -> f64 {
        self.params.get(idx).and_then(Param::as_real).unwrap_or(0.0)
    }

    /// The unitary matrix of this operation, with the first wire as the most
    /// significant index. Inverted operations return the adjoint.
    ///
    /// State preparations have no matrix.
    pub fn matrix(&self) -> Option<Array2<Complex64>> {
        let m = match self.kind {
            OpKind::RX => rx_matrix(self.real(0)),
            OpKind::RY => ry_matrix(self.real(0)),
            OpKind::RZ => rz_matrix(self.real(0)),
            OpKind::Rot => {
                let (phi, theta, omega) = (self.real(0), self.real(1), self.real(2));
                rz_matrix(omega).dot(&ry_matrix(theta)).dot(&rz_matrix(phi))
            }
            OpKind::PhaseShift => array![[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, self.real(0))]],
            OpKind::U3 => {
                let (theta, phi, lambda) = (self.real(0), self.real(1), self.real(2));
                let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
                array![
                    [Complex64::new(c, 0.0), -Complex64::from_polar(s, lambda)],
                    [Complex64::from_polar(s, phi), Complex64::from_polar(c, phi + lambda)]
                ]
            }
            OpKind::PauliX => array![[ZERO, ONE], [ONE, ZERO]],
            OpKind::PauliY => array![[ZERO, -I], [I, ZERO]],
            OpKind::PauliZ => array![[ONE, ZERO], [ZERO, -ONE]],
            OpKind::Hadamard => {
                let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
                array![[h, h], [h, -h]]
            }
            OpKind::S => array![[ONE, ZERO], [ZERO, I]],
            OpKind::T => array![[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, FRAC_PI_4)]],
            OpKind::CNOT => array![
                [ONE, ZERO, ZERO, ZERO],
                [ZERO, ONE, ZERO, ZERO],
                [ZERO, ZERO, ZERO, ONE],
                [ZERO, ZERO, ONE, ZERO]
            ],
            OpKind::CZ => Array2::from_diag(&ndarray::arr1(&[ONE, ONE, ONE, -ONE])),
            OpKind::QubitUnitary => self.params.first()?.as_matrix()?.clone(),
            OpKind::BasisState | OpKind::QubitStateVector => return None,
        };
        if self.inverse {
            Some(adjoint(&m))
        } else {
            Some(m)
        }
    }

    /// Decompose into simpler operations, if the kind defines a decomposition.
    ///
    /// The decomposition of an inverted operation is the reversed list of
    /// inverted components.
    pub fn decomposition(&self) -> Option<Vec<Operation>> {
        let w = self.wires.first()?.clone();
        let ops = match self.kind {
            OpKind::Rot => vec![
                Operation::rz(self.real(0), w.clone()),
                Operation::ry(self.real(1), w.clone()),
                Operation::rz(self.real(2), w),
            ],
            OpKind::U3 => {
                let (theta, phi, lambda) = (self.real(0), self.real(1), self.real(2));
                vec![
                    Operation::rot(lambda, theta, -lambda, w.clone()),
                    Operation::phase_shift(lambda, w.clone()),
                    Operation::phase_shift(phi, w),
                ]
            }
            OpKind::PauliX => vec![
                Operation::phase_shift(FRAC_PI_2, w.clone()),
                Operation::rx(PI, w.clone()),
                Operation::phase_shift(FRAC_PI_2, w),
            ],
            OpKind::PauliY => vec![
                Operation::phase_shift(FRAC_PI_2, w.clone()),
                Operation::ry(PI, w.clone()),
                Operation::phase_shift(FRAC_PI_2, w),
            ],
            OpKind::PauliZ => vec![Operation::phase_shift(PI, w)],
            OpKind::Hadamard => vec![
                Operation::phase_shift(FRAC_PI_2, w.clone()),
                Operation::rx(FRAC_PI_2, w.clone()),
                Operation::phase_shift(FRAC_PI_2, w),
            ],
            OpKind::S => vec![Operation::phase_shift(FRAC_PI_2, w)],
            OpKind::T => vec![Operation::phase_shift(FRAC_PI_4, w)],
            OpKind::BasisState => match self.params.first()? {
                Param::Bits(bits) => bits
                    .iter()
                    .zip(&self.wires)
                    .filter(|(bit, _)| **bit == 1)
                    .map(|(_, wire)| Operation::pauli_x(wire.clone()))
                    .collect(),
                _ => return None,
            },
            _ => return None,
        };
        if self.inverse {
            Some(ops.into_iter().rev().map(Operation::inv).collect())
        } else {
            Some(ops)
        }
    }

    /// The generator of this operation as a bare operation on the same wires,
    /// together with its multiplier: `G(θ) = exp(i · multiplier · θ · generator)`.
    ///
    /// Inverted operations negate the multiplier. Multi-parameter kinds have no
    /// single generator; use the components of their decomposition.
    pub fn generator(&self) -> Option<(Operation, f64)> {
        let w = self.wires.first()?.clone();
        let (generator, multiplier) = match self.kind {
            OpKind::RX => (Operation::pauli_x(w), -0.5),
            OpKind::RY => (Operation::pauli_y(w), -0.5),
            OpKind::RZ => (Operation::pauli_z(w), -0.5),
            OpKind::PhaseShift => {
                let projector = array![[ZERO, ZERO], [ZERO, ONE]];
                (Operation::from_parts(OpKind::QubitUnitary, vec![Param::Matrix(projector)], vec![w]), 1.0)
            }
            _ => return None,
        };
        if self.inverse {
            Some((generator, -multiplier))
        } else {
            Some((generator, multiplier))
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.inverse {
            write!(f, ".inv()")?;
        }
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        let wires: Vec<String> = self.wires.iter().map(ToString::to_string).collect();
        write!(f, "({}, wires=[{}])", params.join(", "), wires.join(", "))
    }
}

/// Conjugate transpose.
pub fn adjoint(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

fn rx_matrix(theta: f64) -> Array2<Complex64> {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    array![
        [Complex64::new(c, 0.0), Complex64::new(0.0, -s)],
        [Complex64::new(0.0, -s), Complex64::new(c, 0.0)]
    ]
}

fn ry_matrix(theta: f64) -> Array2<Complex64> {
    let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    array![
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)]
    ]
}

fn rz_matrix(theta: f64) -> Array2<Complex64> {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)]
    ]
}
