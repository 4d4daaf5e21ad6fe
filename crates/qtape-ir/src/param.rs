//! Parameter values carried by operations and observables.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single entry of an operation's (or observable's) parameter list.
///
/// Only [`Param::Real`] values are differentiable; the other variants exist so
/// that state preparations and matrix-valued operations can share the tape's
/// global parameter index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Param {
    /// A real scalar (rotation angle, phase, ...).
    Real(f64),
    /// A computational basis state.
    Bits(Vec<u8>),
    /// A complex vector (state amplitudes).
    Vector(Array1<Complex64>),
    /// A complex matrix (unitary or Hermitian).
    Matrix(Array2<Complex64>),
}

impl Param {
    /// Get the scalar value, if this is a real parameter.
    #[inline]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Param::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Check if this is a real scalar.
    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self, Param::Real(_))
    }

    /// Get the matrix, if this is a matrix parameter.
    pub fn as_matrix(&self) -> Option<&Array2<Complex64>> {
        match self {
            Param::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Wrap a slice of reals.
    pub fn reals(values: &[f64]) -> Vec<Param> {
        values.iter().copied().map(Param::Real).collect()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Real(v) => write!(f, "{v}"),
            Param::Bits(b) => write!(f, "{b:?}"),
            Param::Vector(v) => write!(f, "vector[{}]", v.len()),
            Param::Matrix(m) => write!(f, "matrix[{}x{}]", m.nrows(), m.ncols()),
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Real(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Param::Real(f64::from(value))
    }
}

impl From<Vec<u8>> for Param {
    fn from(bits: Vec<u8>) -> Self {
        Param::Bits(bits)
    }
}

impl From<Array1<Complex64>> for Param {
    fn from(v: Array1<Complex64>) -> Self {
        Param::Vector(v)
    }
}

impl From<Array2<Complex64>> for Param {
    fn from(m: Array2<Complex64>) -> Self {
        Param::Matrix(m)
    }
}
