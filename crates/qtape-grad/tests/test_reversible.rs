//! Tests for reversible differentiation.

mod common;

use ndarray::{Array1, Array2, array};
use num_complex::Complex64;
use proptest::prelude::*;
use qtape_adapter_sim::DefaultQubit;
use qtape_grad::{AnalyticRule, DiffMethod, GradError, GradientEngine, JacobianOptions, ReversibleDiff};
use qtape_hal::StatevectorAccess;
use qtape_ir::{Observable, Operation, Tape};

use common::{CountingDevice, OpaqueDevice, X, Y, assert_close, expected_jacobian, two_wire_tape};

fn numeric(tape: &mut Tape, dev: &mut DefaultQubit) -> Array2<f64> {
    GradientEngine::new()
        .jacobian(tape, dev, &JacobianOptions::new().with_order(2))
        .unwrap()
}

fn reversible(tape: &mut Tape, dev: &mut DefaultQubit) -> Array2<f64> {
    GradientEngine::reversible()
        .jacobian(
            tape,
            dev,
            &JacobianOptions::new().with_method(DiffMethod::Analytic),
        )
        .unwrap()
}

// ---------------------------------------------------------------------------
// Agreement with finite differences
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_matches_closed_form() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    let [dx, dy] = expected_jacobian(X, Y);
    assert_close(&jac, &array![[dx, dy]], 1e-6);
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

#[test]
fn rot_gates_and_multiple_expectations() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rot(0.1, 0.2, 0.3, 0))
            .apply(Operation::rot(-0.4, 0.5, 1.2, 1))
            .apply(Operation::cnot(0, 1))
            .apply(Operation::rx(0.6, 2))
            .apply(Operation::cz(1, 2))
            .apply(Operation::ry(-0.8, 1))
            .expval(Observable::PauliX(0.into()))
            .expval(Observable::PauliY(1.into()).tensor(Observable::PauliZ(2.into())))
            .expval(Observable::Hadamard(2.into()));
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(3).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    assert_eq!(jac.dim(), (3, 8));
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

#[test]
fn inverted_operations() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.3, 0))
            .apply(Operation::rot(0.2, -0.7, 0.5, 0).inv())
            .apply(Operation::ry(0.9, 1).inv())
            .apply(Operation::cnot(1, 0))
            .expval(Observable::PauliZ(0.into()))
            .expval(Observable::PauliX(1.into()));
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

#[test]
fn inverted_tape() {
    let mut tape = two_wire_tape(X, Y);
    tape.inv();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

#[test]
fn nested_tape_and_fixed_gates() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::basis_state(vec![1, 0], [0, 1])?);
        rec.nested(|inner| {
            inner
                .apply(Operation::hadamard(1))
                .apply(Operation::rz(0.4, 1))
                .apply(Operation::s(0));
            Ok(())
        })?;
        rec.apply(Operation::ry(1.3, 0))
            .apply(Operation::cnot(0, 1))
            .apply(Operation::t(1))
            .expval(Observable::PauliX(1.into()));
        Ok(())
    })
    .unwrap();
    tape.set_trainable_params([1, 2]).unwrap();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    assert_eq!(jac.dim(), (1, 2));
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

#[test]
fn hermitian_observable_on_labelled_wires() {
    let c = |re: f64, im: f64| Complex64::new(re, im);
    let a = array![[c(1.0, 0.0), c(0.5, -0.2)], [c(0.5, 0.2), c(-2.0, 0.0)]];
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.7, "a"))
            .apply(Operation::ry(-0.2, "b"))
            .apply(Operation::cnot("b", "a"))
            .expval(Observable::hermitian(a.clone(), ["a"])?);
        Ok(())
    })
    .unwrap();
    // the Hermitian matrix is parameter 2
    tape.set_trainable_params([0, 1]).unwrap();
    let mut dev = DefaultQubit::new(["b", "a"]).unwrap();

    let jac = reversible(&mut tape, &mut dev);
    assert_close(&jac, &numeric(&mut tape, &mut dev), 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn agrees_with_closed_form(x in -3.0_f64..3.0, y in -3.0_f64..3.0) {
        let mut tape = two_wire_tape(x, y);
        let mut dev = DefaultQubit::with_num_wires(2).unwrap();

        let jac = reversible(&mut tape, &mut dev);
        let [dx, dy] = expected_jacobian(x, y);
        prop_assert!((jac[(0, 0)] - dx).abs() < 1e-8);
        prop_assert!((jac[(0, 1)] - dy).abs() < 1e-8);
    }
}

// ---------------------------------------------------------------------------
// State cache
// ---------------------------------------------------------------------------

#[test]
fn one_execution_per_jacobian() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = CountingDevice::new(2);
    let mut engine = GradientEngine::reversible();

    engine
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_eq!(dev.executions, 1);

    // a new call drops the cache and sees new parameter values
    let jac = engine
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_params(vec![0.1, 0.2]),
        )
        .unwrap();
    assert_eq!(dev.executions, 2);
    let [dx, dy] = expected_jacobian(0.1, 0.2);
    assert_close(&jac, &array![[dx, dy]], 1e-8);
}

#[test]
fn device_state_is_restored_after_replay() {
    let tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();
    let mut rule = ReversibleDiff::new();

    let d0: Array1<f64> = rule.partial(&tape, &mut dev, 0).unwrap();
    let cached = rule.cached_state().unwrap().clone();
    assert_eq!(dev.state().unwrap(), cached);

    let d1 = rule.partial(&tape, &mut dev, 1).unwrap();
    assert_eq!(dev.state().unwrap(), cached);
    let [dx, dy] = expected_jacobian(X, Y);
    assert!((d0[0] - dx).abs() < 1e-8);
    assert!((d1[0] - dy).abs() < 1e-8);
}

// ---------------------------------------------------------------------------
// Restrictions
// ---------------------------------------------------------------------------

#[test]
fn variance_and_probability_are_unsupported() {
    let mut dev = DefaultQubit::with_num_wires(1).unwrap();
    let var = Tape::build(|rec| {
        rec.apply(Operation::rx(0.1, 0)).var(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    let probs = Tape::build(|rec| {
        rec.apply(Operation::rx(0.1, 0)).probs([0]);
        Ok(())
    })
    .unwrap();

    for tape in [var, probs] {
        let err = ReversibleDiff::new().partial(&tape, &mut dev, 0).unwrap_err();
        assert!(matches!(err, GradError::UnsupportedObservable(_)));
    }
}

#[test]
fn gates_outside_the_rotation_set_are_unsupported() {
    let tape = Tape::build(|rec| {
        rec.apply(Operation::phase_shift(0.1, 0))
            .expval(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(1).unwrap();

    let err = ReversibleDiff::new().partial(&tape, &mut dev, 0).unwrap_err();
    assert!(matches!(err, GradError::UnsupportedOperation(ref name) if name == "PhaseShift"));
}

#[test]
fn unsupported_gate_falls_back_to_finite_differences() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.3, 0))
            .apply(Operation::phase_shift(0.1, 0))
            .apply(Operation::hadamard(0))
            .expval(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(1).unwrap();

    let best = GradientEngine::reversible()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_close(&best, &numeric(&mut tape, &mut dev), 1e-6);

    let err = GradientEngine::reversible()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_method(DiffMethod::Analytic),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GradError::NonDifferentiableParameter { ref params } if params == &[1]
    ));
}

#[test]
fn device_without_statevector() {
    let tape = two_wire_tape(X, Y);
    let mut dev = OpaqueDevice::new(2);

    let err = ReversibleDiff::new().partial(&tape, &mut dev, 0).unwrap_err();
    assert!(matches!(err, GradError::UnsupportedDevice(ref name) if name == "opaque"));
}
