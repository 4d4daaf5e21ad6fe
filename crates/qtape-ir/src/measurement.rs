//! Measurement processes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::observable::Observable;
use crate::wire::Wire;

/// The statistic a measurement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnKind {
    /// Expectation value of an observable.
    Expectation,
    /// Variance of an observable.
    Variance,
    /// Eigenvalue samples of an observable.
    Sample,
    /// Computational basis probabilities over a set of wires.
    Probability,
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReturnKind::Expectation => "expval",
            ReturnKind::Variance => "var",
            ReturnKind::Sample => "sample",
            ReturnKind::Probability => "probs",
        };
        f.write_str(s)
    }
}

/// A measurement requested at the end of a tape.
///
/// Observable measurements carry their observable. Probability measurements
/// carry wires only, and may carry precomputed eigenvalues when produced by
/// measurement expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    kind: ReturnKind,
    obs: Option<Observable>,
    wires: Vec<Wire>,
    eigvals: Option<Vec<f64>>,
}

impl Measurement {
    fn with_observable(kind: ReturnKind, obs: Observable) -> Self {
        Self {
            kind,
            wires: obs.wires(),
            obs: Some(obs),
            eigvals: None,
        }
    }

    /// Expectation value of `obs`.
    pub fn expval(obs: Observable) -> Self {
        Self::with_observable(ReturnKind::Expectation, obs)
    }

    /// Variance of `obs`.
    pub fn var(obs: Observable) -> Self {
        Self::with_observable(ReturnKind::Variance, obs)
    }

    /// Samples of `obs`.
    pub fn sample(obs: Observable) -> Self {
        Self::with_observable(ReturnKind::Sample, obs)
    }

    /// Probabilities of every basis state on `wires`.
    pub fn probs(wires: impl IntoIterator<Item = impl Into<Wire>>) -> Self {
        Self {
            kind: ReturnKind::Probability,
            obs: None,
            wires: wires.into_iter().map(Into::into).collect(),
            eigvals: None,
        }
    }

    /// A measurement in the computational basis of `wires`, reporting the
    /// given eigenvalues. Produced when observables are rotated away.
    pub fn diagonalized(kind: ReturnKind, wires: Vec<Wire>, eigvals: Vec<f64>) -> Self {
        Self {
            kind,
            obs: None,
            wires,
            eigvals: Some(eigvals),
        }
    }

    /// Attach precomputed eigenvalues.
    #[must_use]
    pub fn with_eigvals(mut self, eigvals: Vec<f64>) -> Self {
        self.eigvals = Some(eigvals);
        self
    }

    /// Get the return kind.
    #[inline]
    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Get the observable, if any.
    #[inline]
    pub fn observable(&self) -> Option<&Observable> {
        self.obs.as_ref()
    }

    pub(crate) fn observable_mut(&mut self) -> Option<&mut Observable> {
        self.obs.as_mut()
    }

    /// Get the measured wires.
    #[inline]
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Get precomputed eigenvalues, if any.
    pub fn eigvals(&self) -> Option<&[f64]> {
        self.eigvals.as_deref()
    }

    /// Number of output entries this measurement contributes to a result
    /// vector, as estimated before execution.
    pub fn output_dim_estimate(&self) -> usize {
        match self.kind {
            ReturnKind::Probability => 1 << self.wires.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.obs {
            Some(obs) => write!(f, "{}({})", self.kind, obs),
            None => {
                let wires: Vec<String> = self.wires.iter().map(ToString::to_string).collect();
                write!(f, "{}(wires=[{}])", self.kind, wires.join(", "))
            }
        }
    }
}
