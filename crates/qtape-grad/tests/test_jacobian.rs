//! Tests for Jacobian assembly.

mod common;

use ndarray::{Array2, array};
use num_complex::Complex64;
use qtape_adapter_sim::DefaultQubit;
use qtape_grad::{DiffMethod, GradError, GradientEngine, JacobianOptions};
use qtape_ir::{GradMethod, Observable, Operation, Param, Tape};

use common::{
    CountingDevice, NativeJacobianDevice, X, Y, assert_close, expected_jacobian, two_wire_tape,
};

fn expected() -> Array2<f64> {
    let [dx, dy] = expected_jacobian(X, Y);
    array![[dx, dy]]
}

/// QubitStateVector on (0, 1), RX(x) on 0, RY(y) on 1, probs over both wires.
fn state_prep_tape() -> Tape {
    let h = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
    let z = Complex64::new(0.0, 0.0);
    Tape::build(|rec| {
        rec.apply(Operation::qubit_state_vector(array![h, z, z, h], [0, 1])?)
            .apply(Operation::rx(0.3, 0))
            .apply(Operation::ry(0.7, 1))
            .probs([0, 1]);
        Ok(())
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Finite differences
// ---------------------------------------------------------------------------

#[test]
fn forward_difference_end_to_end() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_close(&jac, &expected(), 1e-6);
}

#[test]
fn centred_difference_end_to_end() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new().with_order(2))
        .unwrap();
    assert_close(&jac, &expected(), 1e-6);
}

#[test]
fn forward_difference_shares_baseline() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = CountingDevice::new(2);

    GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_eq!(dev.executions, 3);
}

#[test]
fn centred_difference_has_no_baseline() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = CountingDevice::new(2);

    GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new().with_order(2))
        .unwrap();
    assert_eq!(dev.executions, 4);
}

#[test]
fn numeric_pd_computes_missing_baseline() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = CountingDevice::new(2);
    let engine = GradientEngine::new();

    let col = engine
        .numeric_pd(&mut tape, &mut dev, 1, None, 1, 1e-7)
        .unwrap();
    assert_eq!(dev.executions, 2);
    assert!((col[0] - expected_jacobian(X, Y)[1]).abs() < 1e-6);
    assert_eq!(tape.get_parameters(false), Param::reals(&[X, Y]));
}

#[test]
fn step_size_is_configurable() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let coarse = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new().with_step(0.5))
        .unwrap();
    assert!((coarse[(0, 0)] - expected()[(0, 0)]).abs() > 1e-3);
}

// ---------------------------------------------------------------------------
// Method selection
// ---------------------------------------------------------------------------

#[test]
fn no_trainable_parameters_gives_empty_jacobian() {
    let mut tape = two_wire_tape(X, Y);
    tape.set_trainable_params(Vec::new()).unwrap();
    let mut dev = CountingDevice::new(2);

    for mut engine in [GradientEngine::new(), GradientEngine::reversible()] {
        let jac = engine
            .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
            .unwrap();
        assert_eq!(jac.dim(), (1, 0));
    }
    assert_eq!(dev.executions, 0);
}

#[test]
fn zero_tagged_parameter_skips_device() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.3, 0))
            .apply(Operation::ry(0.9, 1))
            .expval(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    let mut dev = CountingDevice::new(2);
    let mut engine = GradientEngine::reversible();

    let jac = engine
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_eq!(tape.par_info()[1].grad_method, Some(GradMethod::Zero));
    assert!((jac[(0, 0)] + 0.3_f64.sin()).abs() < 1e-8);
    assert_eq!(jac[(0, 1)], 0.0);
    // one execution caches the state for the analytic column
    assert_eq!(dev.executions, 1);
}

#[test]
fn unreachable_parameter_without_analytic_backend_is_finite_difference() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.3, 0))
            .apply(Operation::ry(0.9, 1))
            .expval(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    GradientEngine::new().update_gradient_info(&mut tape);
    assert_eq!(tape.par_info()[1].grad_method, Some(GradMethod::FiniteDiff));
}

#[test]
fn numeric_method_matches_best() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let numeric = GradientEngine::reversible()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_method(DiffMethod::Numeric),
        )
        .unwrap();
    assert_close(&numeric, &expected(), 1e-6);
}

#[test]
fn analytic_method_requires_analytic_tags() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let err = GradientEngine::new()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_method(DiffMethod::Analytic),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GradError::NonDifferentiableParameter { ref params } if params == &[0, 1]
    ));
}

#[test]
fn unknown_method_and_bad_order() {
    assert!(matches!(
        "adjoint-ish".parse::<DiffMethod>(),
        Err(GradError::UnknownGradientMethod(_))
    ));

    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();
    let err = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new().with_order(3))
        .unwrap_err();
    assert!(matches!(err, GradError::UnsupportedOrder(3)));
}

// ---------------------------------------------------------------------------
// Non-differentiable parameters
// ---------------------------------------------------------------------------

#[test]
fn state_preparation_parameter_is_rejected() {
    let mut tape = state_prep_tape();
    tape.set_trainable_params([0]).unwrap();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let err = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot differentiate with respect to parameter(s) {0}"
    );
}

#[test]
fn probability_jacobian_shape() {
    let mut tape = state_prep_tape();
    tape.set_trainable_params([1, 2]).unwrap();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_eq!(jac.dim(), (4, 2));
    // probabilities sum to one, so every column sums to zero
    for col in jac.columns() {
        assert!(col.sum().abs() < 1e-6);
    }
}

// ---------------------------------------------------------------------------
// Transient parameters and output dimension
// ---------------------------------------------------------------------------

#[test]
fn explicit_params_are_transient() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();
    let (x, y) = (0.1, 0.2);

    let jac = GradientEngine::new()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_params(vec![x, y]),
        )
        .unwrap();
    let [dx, dy] = expected_jacobian(x, y);
    assert_close(&jac, &array![[dx, dy]], 1e-6);
    assert_eq!(tape.get_parameters(false), Param::reals(&[X, Y]));
}

#[test]
fn output_dimension_self_corrects() {
    let mut tape = two_wire_tape(X, Y);
    tape.set_output_dim(7);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let jac = GradientEngine::new()
        .jacobian(&mut tape, &mut dev, &JacobianOptions::new())
        .unwrap();
    assert_eq!(jac.dim(), (1, 2));
    assert_eq!(tape.output_dim(), 1);
}

// ---------------------------------------------------------------------------
// Device-native Jacobians
// ---------------------------------------------------------------------------

#[test]
fn device_method_uses_native_jacobian() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = NativeJacobianDevice::new(2, 3);

    let jac = GradientEngine::new()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_method(DiffMethod::Device),
        )
        .unwrap();
    assert_eq!(jac.dim(), (3, 2));
    assert_eq!(jac[(2, 1)], 21.0);
    assert_eq!(tape.output_dim(), 3);
}

#[test]
fn device_method_without_native_support() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let err = GradientEngine::new()
        .jacobian(
            &mut tape,
            &mut dev,
            &JacobianOptions::new().with_method(DiffMethod::Device),
        )
        .unwrap_err();
    assert!(matches!(err, GradError::Hal(_)));
}
