//! Device configuration.

use serde::{Deserialize, Serialize};

use qtape_ir::Wire;

use crate::device::Device;
use crate::error::HalResult;

/// Configuration for a device instance.
///
/// Serializes to a flat JSON object; unknown keys are collected in `extra`
/// so device-specific options can travel with the common ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name of the device.
    pub name: String,
    /// Wire labels, in device order.
    #[serde(default)]
    pub wires: Vec<Wire>,
    /// Number of shots for sampled measurements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    /// Seed for the device's random number generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceConfig {
    /// Create a new device configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wires: Vec::new(),
            shots: None,
            seed: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the wire labels.
    #[must_use]
    pub fn with_wires(mut self, wires: impl IntoIterator<Item = impl Into<Wire>>) -> Self {
        self.wires = wires.into_iter().map(Into::into).collect();
        self
    }

    /// Use `n` integer wires labelled `0..n`.
    #[must_use]
    pub fn with_num_wires(self, n: u32) -> Self {
        self.with_wires(0..n)
    }

    /// Set the number of shots.
    #[must_use]
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add extra configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> HalResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> HalResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Trait for creating devices from configuration.
pub trait DeviceFactory: Device + Sized {
    /// Create a device from configuration.
    fn from_config(config: DeviceConfig) -> HalResult<Self>;
}
