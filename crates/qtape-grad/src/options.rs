//! Jacobian configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GradError;

/// Default finite-difference step size.
pub const DEFAULT_STEP: f64 = 1e-7;

/// Strategy used to assemble a Jacobian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMethod {
    /// Per-parameter choice from the inferred gradient-method tags.
    #[default]
    Best,
    /// Analytic derivatives for every trainable parameter.
    Analytic,
    /// Finite differences for every trainable parameter.
    Numeric,
    /// The device's native Jacobian.
    Device,
}

impl fmt::Display for DiffMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiffMethod::Best => "best",
            DiffMethod::Analytic => "analytic",
            DiffMethod::Numeric => "numeric",
            DiffMethod::Device => "device",
        };
        f.write_str(s)
    }
}

impl FromStr for DiffMethod {
    type Err = GradError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(DiffMethod::Best),
            "analytic" => Ok(DiffMethod::Analytic),
            "numeric" => Ok(DiffMethod::Numeric),
            "device" => Ok(DiffMethod::Device),
            other => Err(GradError::UnknownGradientMethod(other.to_string())),
        }
    }
}

/// Options for [`GradientEngine::jacobian`](crate::GradientEngine::jacobian).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JacobianOptions {
    /// Differentiation strategy.
    #[serde(default)]
    pub method: DiffMethod,
    /// Finite-difference order: 1 (forward) or 2 (centred).
    #[serde(default = "default_order")]
    pub order: u32,
    /// Finite-difference step size.
    #[serde(default = "default_step")]
    pub h: f64,
    /// Trainable parameter values to use for this call only.
    ///
    /// Real scalars, one per trainable parameter; the trainable set must not
    /// include matrix parameters (see [`execute`](crate::execute)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<f64>>,
}

fn default_order() -> u32 {
    1
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

impl Default for JacobianOptions {
    fn default() -> Self {
        Self {
            method: DiffMethod::Best,
            order: default_order(),
            h: DEFAULT_STEP,
            params: None,
        }
    }
}

impl JacobianOptions {
    /// Create options with the default method, order and step.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the differentiation method.
    #[must_use]
    pub fn with_method(mut self, method: DiffMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the finite-difference order.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Set the finite-difference step size.
    #[must_use]
    pub fn with_step(mut self, h: f64) -> Self {
        self.h = h;
        self
    }

    /// Use these trainable parameter values for the call only.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = Some(params);
        self
    }
}
