//! Reference statevector device.

use ndarray::{Array1, ArrayD};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, instrument};

use qtape_hal::{
    Capabilities, Device, DeviceConfig, DeviceFactory, HalError, HalResult, StatevectorAccess,
};
use qtape_ir::{Measurement, Operation, ReturnKind, Tape, Wire};

use crate::statevector::Statevector;

/// Shots drawn for sample measurements when none are configured.
pub const DEFAULT_SHOTS: u32 = 1000;

/// Maximum number of wires the dense simulator accepts.
pub const MAX_WIRES: u32 = 24;

/// Dense statevector simulator over a declared list of wires.
///
/// Expectations, variances and probabilities are exact. Sample measurements
/// draw `shots` eigenvalues from the exact distribution.
pub struct DefaultQubit {
    config: DeviceConfig,
    caps: Capabilities,
    wire_map: FxHashMap<Wire, usize>,
    shots: u32,
    rng: StdRng,
    /// State after the last execution, before diagonalizing rotations.
    state: Option<Statevector>,
}

impl DefaultQubit {
    /// Create a device over the given wire labels.
    pub fn new(wires: impl IntoIterator<Item = impl Into<Wire>>) -> HalResult<Self> {
        Self::from_config(DeviceConfig::new("default.qubit").with_wires(wires))
    }

    /// Create a device over wires `0..n`.
    pub fn with_num_wires(n: u32) -> HalResult<Self> {
        Self::from_config(DeviceConfig::new("default.qubit").with_num_wires(n))
    }

    /// The configuration this device was built from.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Wire labels, in device order.
    pub fn wires(&self) -> &[Wire] {
        &self.config.wires
    }

    /// Number of shots used for sample measurements.
    pub fn shots(&self) -> u32 {
        self.shots
    }

    fn positions(&self, wires: &[Wire]) -> HalResult<Vec<usize>> {
        wires.iter().map(|w| self.wire_position(w)).collect()
    }

    fn apply_all(&self, sv: &mut Statevector, ops: &[Operation]) -> HalResult<()> {
        for op in ops {
            let positions = self.positions(op.wires())?;
            sv.apply(op, &positions)?;
        }
        Ok(())
    }

    /// Evaluate one measurement against the pre-rotated state.
    fn measure(&mut self, state: &Statevector, m: &Measurement) -> HalResult<Array1<f64>> {
        if m.kind() == ReturnKind::Probability {
            let positions = self.positions(m.wires())?;
            return Ok(Array1::from(state.probabilities(&positions)));
        }

        let (probs, eigvals) = match (m.observable(), m.eigvals()) {
            (Some(obs), _) => {
                let mut rotated = state.clone();
                self.apply_all(&mut rotated, &obs.diagonalizing_gates()?)?;
                let positions = self.positions(&obs.wires())?;
                (rotated.probabilities(&positions), obs.eigvals()?.to_vec())
            }
            // Already rotated by the tape's own operations.
            (None, Some(eigvals)) => {
                let positions = self.positions(m.wires())?;
                (state.probabilities(&positions), eigvals.to_vec())
            }
            (None, None) => {
                return Err(HalError::Unsupported(format!(
                    "{} measurement without an observable or eigenvalues",
                    m.kind()
                )));
            }
        };
        if probs.len() != eigvals.len() {
            return Err(HalError::InvalidState(format!(
                "{} eigenvalues for {} outcomes",
                eigvals.len(),
                probs.len()
            )));
        }

        let mean: f64 = probs.iter().zip(&eigvals).map(|(p, l)| p * l).sum();
        match m.kind() {
            ReturnKind::Expectation => Ok(Array1::from(vec![mean])),
            ReturnKind::Variance => {
                let second: f64 = probs.iter().zip(&eigvals).map(|(p, l)| p * l * l).sum();
                Ok(Array1::from(vec![second - mean * mean]))
            }
            ReturnKind::Sample => {
                let outcomes = Statevector::sample_indices(&probs, self.shots as usize, &mut self.rng)?;
                Ok(outcomes.into_iter().map(|k| eigvals[k]).collect())
            }
            ReturnKind::Probability => unreachable!("handled above"),
        }
    }
}

impl Device for DefaultQubit {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    #[instrument(skip(self, tape))]
    fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
        let start = Instant::now();
        self.validate(tape)?;

        let ops = tape.flat_operations();
        debug!(
            "Starting simulation: {} wires, {} operations, {} measurements",
            self.wire_map.len(),
            ops.len(),
            tape.measurements().len()
        );

        let mut sv = Statevector::new(self.wire_map.len());
        self.apply_all(&mut sv, &ops)?;

        let mut results = Vec::with_capacity(tape.measurements().len());
        for m in tape.measurements() {
            results.push(self.measure(&sv, m)?);
        }
        self.state = Some(sv);

        debug!("Simulation completed in {:?}", start.elapsed());
        Ok(results)
    }

    fn statevector(&mut self) -> Option<&mut dyn StatevectorAccess> {
        Some(self)
    }
}

impl StatevectorAccess for DefaultQubit {
    fn num_wires(&self) -> usize {
        self.wire_map.len()
    }

    fn wire_position(&self, wire: &Wire) -> HalResult<usize> {
        self.wire_map
            .get(wire)
            .copied()
            .ok_or_else(|| HalError::UnknownWire(wire.to_string()))
    }

    fn state(&self) -> Option<ArrayD<Complex64>> {
        self.state.as_ref().map(Statevector::to_tensor)
    }

    fn set_state(&mut self, state: ArrayD<Complex64>) -> HalResult<()> {
        let sv = Statevector::from_tensor(&state)?;
        if sv.num_qubits() != self.wire_map.len() {
            return Err(HalError::InvalidState(format!(
                "state has {} wires, device has {}",
                sv.num_qubits(),
                self.wire_map.len()
            )));
        }
        self.state = Some(sv);
        Ok(())
    }

    fn apply_operations(&mut self, ops: &[Operation]) -> HalResult<()> {
        let mut sv = self
            .state
            .take()
            .unwrap_or_else(|| Statevector::new(self.wire_map.len()));
        let result = self.apply_all(&mut sv, ops);
        self.state = Some(sv);
        result
    }
}

impl DeviceFactory for DefaultQubit {
    fn from_config(config: DeviceConfig) -> HalResult<Self> {
        if config.wires.is_empty() {
            return Err(HalError::Configuration(
                "default.qubit requires at least one wire".into(),
            ));
        }
        let max_wires = config
            .extra
            .get("max_wires")
            .and_then(serde_json::value::Value::as_u64)
            .map_or(MAX_WIRES, |v| v as u32);
        let num_wires = config.wires.len() as u32;
        if num_wires > max_wires {
            return Err(HalError::TooManyWires {
                requested: num_wires as usize,
                available: max_wires as usize,
            });
        }

        let mut wire_map = FxHashMap::default();
        for (pos, wire) in config.wires.iter().enumerate() {
            if wire_map.insert(wire.clone(), pos).is_some() {
                return Err(HalError::Configuration(format!("duplicate wire label {wire}")));
            }
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let caps = Capabilities::statevector_simulator(config.name.clone(), num_wires)
            .with_shots(config.shots);

        Ok(Self {
            shots: config.shots.unwrap_or(DEFAULT_SHOTS),
            config,
            caps,
            wire_map,
            rng,
            state: None,
        })
    }
}
