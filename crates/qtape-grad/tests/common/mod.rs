//! Test devices wrapping the reference simulator.
//!
//! `CountingDevice` counts executions so tests can check how many device
//! calls a strategy makes. `NativeJacobianDevice` reports a fixed Jacobian.
//! `OpaqueDevice` hides its statevector.

#![allow(dead_code)]

use ndarray::{Array1, Array2};

use qtape_adapter_sim::DefaultQubit;
use qtape_hal::{Capabilities, Device, FEATURE_JACOBIAN, HalResult, StatevectorAccess};
use qtape_ir::{Observable, Operation, Tape};

pub const X: f64 = 0.543;
pub const Y: f64 = -0.654;

/// RX(x) on 0, RY(y) on 1, CNOT, ⟨Z0 ⊗ X1⟩ = sin(y)·cos(x).
pub fn two_wire_tape(x: f64, y: f64) -> Tape {
    Tape::build(|rec| {
        rec.apply(Operation::rx(x, 0))
            .apply(Operation::ry(y, 1))
            .apply(Operation::cnot(0, 1))
            .expval(Observable::PauliZ(0.into()).tensor(Observable::PauliX(1.into())));
        Ok(())
    })
    .unwrap()
}

pub fn expected_jacobian(x: f64, y: f64) -> [f64; 2] {
    [-y.sin() * x.sin(), y.cos() * x.cos()]
}

pub fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
    assert_eq!(a.dim(), b.dim());
    for (u, v) in a.iter().zip(b.iter()) {
        assert!((u - v).abs() < tol, "{a} != {b}");
    }
}

// ---------------------------------------------------------------------------
// Counting device
// ---------------------------------------------------------------------------

pub struct CountingDevice {
    inner: DefaultQubit,
    pub executions: usize,
}

impl CountingDevice {
    pub fn new(num_wires: u32) -> Self {
        Self {
            inner: DefaultQubit::with_num_wires(num_wires).unwrap(),
            executions: 0,
        }
    }
}

impl Device for CountingDevice {
    fn name(&self) -> &str {
        "counting"
    }

    fn capabilities(&self) -> &Capabilities {
        self.inner.capabilities()
    }

    fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
        self.executions += 1;
        self.inner.execute(tape)
    }

    fn statevector(&mut self) -> Option<&mut dyn StatevectorAccess> {
        self.inner.statevector()
    }
}

// ---------------------------------------------------------------------------
// Native Jacobian device
// ---------------------------------------------------------------------------

pub struct NativeJacobianDevice {
    inner: DefaultQubit,
    caps: Capabilities,
    pub rows: usize,
}

impl NativeJacobianDevice {
    pub fn new(num_wires: u32, rows: usize) -> Self {
        let inner = DefaultQubit::with_num_wires(num_wires).unwrap();
        let caps = inner.capabilities().clone().with_feature(FEATURE_JACOBIAN);
        Self { inner, caps, rows }
    }
}

impl Device for NativeJacobianDevice {
    fn name(&self) -> &str {
        "native-jacobian"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
        self.inner.execute(tape)
    }

    fn jacobian(&mut self, tape: &Tape) -> HalResult<Array2<f64>> {
        Ok(Array2::from_shape_fn((self.rows, tape.num_trainable()), |(i, j)| {
            (i * 10 + j) as f64
        }))
    }
}

// ---------------------------------------------------------------------------
// Opaque device
// ---------------------------------------------------------------------------

pub struct OpaqueDevice {
    inner: DefaultQubit,
}

impl OpaqueDevice {
    pub fn new(num_wires: u32) -> Self {
        Self {
            inner: DefaultQubit::with_num_wires(num_wires).unwrap(),
        }
    }
}

impl Device for OpaqueDevice {
    fn name(&self) -> &str {
        "opaque"
    }

    fn capabilities(&self) -> &Capabilities {
        self.inner.capabilities()
    }

    fn execute(&mut self, tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
        self.inner.execute(tape)
    }
}
