//! Device capability introspection.
//!
//! [`Capabilities`] describes what a device can do: how many wires it has,
//! which operations and observables it understands, whether it samples, and
//! which optional features (statevector access, native Jacobians) it exposes.
//! The gradient engine inspects these before choosing a strategy.

use serde::{Deserialize, Serialize};

use qtape_ir::OpKind;

/// Feature flag for devices that expose their statevector.
pub const FEATURE_STATEVECTOR: &str = "statevector";
/// Feature flag for devices that compute Jacobians natively.
pub const FEATURE_JACOBIAN: &str = "jacobian";

/// Capabilities of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the device.
    pub name: String,
    /// Number of wires available.
    pub num_wires: u32,
    /// Supported operations.
    pub gate_set: GateSet,
    /// Supported observable names.
    pub observables: Vec<String>,
    /// Number of shots used for sampling. `None` means exact (analytic) results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
    /// Additional capability flags, e.g. [`FEATURE_STATEVECTOR`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for a statevector simulator supporting the whole
    /// operation catalog.
    pub fn statevector_simulator(name: impl Into<String>, num_wires: u32) -> Self {
        Self {
            name: name.into(),
            num_wires,
            gate_set: GateSet::catalog(),
            observables: ["PauliX", "PauliY", "PauliZ", "Hadamard", "Identity", "Hermitian"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            shots: None,
            is_simulator: true,
            features: vec![FEATURE_STATEVECTOR.into()],
        }
    }

    /// Set the number of shots.
    #[must_use]
    pub fn with_shots(mut self, shots: Option<u32>) -> Self {
        self.shots = shots;
        self
    }

    /// Add a feature flag.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        if !self.has_feature(&feature) {
            self.features.push(feature);
        }
        self
    }

    /// Check if a feature flag is set.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Check if the device exposes its statevector.
    pub fn supports_statevector(&self) -> bool {
        self.has_feature(FEATURE_STATEVECTOR)
    }

    /// Check if the device computes Jacobians natively.
    pub fn provides_jacobian(&self) -> bool {
        self.has_feature(FEATURE_JACOBIAN)
    }

    /// Check if an operation is supported.
    pub fn supports_operation(&self, name: &str) -> bool {
        self.gate_set.contains(name)
    }

    /// Check if an observable is supported. Tensor products are checked factor
    /// by factor by the caller.
    pub fn supports_observable(&self, name: &str) -> bool {
        self.observables.iter().any(|o| o == name)
    }
}

/// Set of operations a device supports, by catalog name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-wire operations.
    pub single_qubit: Vec<String>,
    /// Two-wire operations.
    pub two_qubit: Vec<String>,
    /// Operations on a variable number of wires (matrices, state preparation).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multi_qubit: Vec<String>,
}

impl GateSet {
    /// The whole operation catalog.
    pub fn catalog() -> Self {
        let mut set = Self {
            single_qubit: vec![],
            two_qubit: vec![],
            multi_qubit: vec![],
        };
        for kind in OpKind::all() {
            let name = kind.name().to_string();
            match kind.num_wires() {
                Some(1) => set.single_qubit.push(name),
                Some(2) => set.two_qubit.push(name),
                _ => set.multi_qubit.push(name),
            }
        }
        set
    }

    /// Check if an operation is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate)
            || self.two_qubit.iter().any(|g| g == gate)
            || self.multi_qubit.iter().any(|g| g == gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statevector_simulator_capabilities() {
        let caps = Capabilities::statevector_simulator("default.qubit", 3);
        assert!(caps.is_simulator);
        assert!(caps.supports_statevector());
        assert!(!caps.provides_jacobian());
        assert!(caps.supports_operation("Rot"));
        assert!(caps.supports_operation("QubitStateVector"));
        assert!(caps.supports_observable("Hermitian"));
        assert_eq!(caps.shots, None);
    }

    #[test]
    fn test_catalog_split_by_arity() {
        let set = GateSet::catalog();
        assert!(set.single_qubit.contains(&"RX".to_string()));
        assert!(set.two_qubit.contains(&"CNOT".to_string()));
        assert!(set.multi_qubit.contains(&"BasisState".to_string()));
        assert!(!set.contains("SWAP"));
    }

    #[test]
    fn test_with_feature_is_idempotent() {
        let caps = Capabilities::statevector_simulator("sim", 1)
            .with_feature(FEATURE_JACOBIAN)
            .with_feature(FEATURE_JACOBIAN);
        assert_eq!(caps.features.len(), 2);
        assert!(caps.provides_jacobian());
    }

    #[test]
    fn test_capabilities_serde() {
        let caps = Capabilities::statevector_simulator("sim", 2).with_shots(Some(100));
        let json = serde_json::to_string(&caps).unwrap();
        let back: Capabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shots, Some(100));
        assert_eq!(back.num_wires, 2);
    }
}
