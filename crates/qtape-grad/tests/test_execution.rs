//! Tests for tape execution.

mod common;

use ndarray::Array1;
use qtape_adapter_sim::DefaultQubit;
use qtape_grad::{GradError, MeasurementValue, execute, execute_flat};
use qtape_hal::{Capabilities, Device, DeviceConfig, DeviceFactory, HalResult};
use qtape_ir::{IrError, Observable, Operation, Param, Tape};

use common::{CountingDevice, X, Y, two_wire_tape};

// ---------------------------------------------------------------------------
// Values and shapes
// ---------------------------------------------------------------------------

#[test]
fn expectation_value_end_to_end() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let res = execute(&mut tape, &mut dev, None).unwrap();
    assert_eq!(res.len(), 1);
    let value = res[0].as_scalar().unwrap();
    assert!((value - Y.sin() * X.cos()).abs() < 1e-10);
}

#[test]
fn mixed_result_shapes() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.4, 0))
            .apply(Operation::cnot(0, 1))
            .expval(Observable::PauliZ(0.into()))
            .var(Observable::PauliZ(1.into()))
            .probs([0, 1]);
        Ok(())
    })
    .unwrap();
    assert_eq!(tape.output_dim(), 6);

    let mut dev = DefaultQubit::with_num_wires(2).unwrap();
    let res = execute(&mut tape, &mut dev, None).unwrap();
    assert!(matches!(res[0], MeasurementValue::Scalar(_)));
    assert!(matches!(res[1], MeasurementValue::Scalar(_)));
    assert_eq!(res[2].as_vector().unwrap().len(), 4);

    let flat = execute_flat(&mut tape, &mut dev, None).unwrap();
    assert_eq!(flat.len(), 6);
    let total: f64 = flat.iter().skip(2).sum();
    assert!((total - 1.0).abs() < 1e-10);
}

#[test]
fn sample_output_dimension_self_corrects() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::hadamard(0)).sample(Observable::PauliZ(0.into()));
        Ok(())
    })
    .unwrap();
    assert_eq!(tape.output_dim(), 1);

    let mut dev = DefaultQubit::from_config(
        DeviceConfig::new("default.qubit")
            .with_num_wires(1)
            .with_shots(10)
            .with_seed(5),
    )
    .unwrap();
    let res = execute(&mut tape, &mut dev, None).unwrap();
    assert_eq!(res[0].len(), 10);
    assert_eq!(tape.output_dim(), 10);
}

#[test]
fn no_measurements_means_no_device_call() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.1, 0));
        Ok(())
    })
    .unwrap();

    let mut dev = CountingDevice::new(1);
    let res = execute(&mut tape, &mut dev, None).unwrap();
    assert!(res.is_empty());
    assert_eq!(dev.executions, 0);
}

// ---------------------------------------------------------------------------
// Transient parameters
// ---------------------------------------------------------------------------

#[test]
fn explicit_params_are_transient() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let res = execute(&mut tape, &mut dev, Some(&[0.1, 0.2])).unwrap();
    let value = res[0].as_scalar().unwrap();
    assert!((value - 0.2_f64.sin() * 0.1_f64.cos()).abs() < 1e-10);
    assert_eq!(tape.get_parameters(false), Param::reals(&[X, Y]));
}

#[test]
fn explicit_params_follow_trainable_subset() {
    let mut tape = two_wire_tape(X, Y);
    tape.set_trainable_params([1]).unwrap();
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let res = execute(&mut tape, &mut dev, Some(&[0.3])).unwrap();
    let value = res[0].as_scalar().unwrap();
    assert!((value - 0.3_f64.sin() * X.cos()).abs() < 1e-10);
    assert_eq!(tape.get_parameters(true), Param::reals(&[Y]));
}

#[test]
fn wrong_param_count_leaves_tape_untouched() {
    let mut tape = two_wire_tape(X, Y);
    let mut dev = DefaultQubit::with_num_wires(2).unwrap();

    let err = execute(&mut tape, &mut dev, Some(&[0.1])).unwrap_err();
    assert!(matches!(
        err,
        GradError::Ir(IrError::ParameterCountMismatch {
            expected: 2,
            got: 1
        })
    ));
    assert_eq!(tape.get_parameters(false), Param::reals(&[X, Y]));
}

#[test]
fn params_restored_after_device_error() {
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.5, "q")).expval(Observable::PauliZ("q".into()));
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(1).unwrap();

    assert!(matches!(
        execute(&mut tape, &mut dev, Some(&[1.5])),
        Err(GradError::Hal(_))
    ));
    assert_eq!(tape.get_parameters(false), Param::reals(&[0.5]));
}

#[test]
fn explicit_params_need_scalar_trainable_set() {
    let z = |re: f64| num_complex::Complex64::new(re, 0.0);
    let herm = ndarray::array![[z(1.0), z(0.5)], [z(0.5), z(-1.0)]];
    let mut tape = Tape::build(|rec| {
        rec.apply(Operation::rx(0.4, 0))
            .apply(Operation::ry(0.2, 0))
            .expval(Observable::hermitian(herm.clone(), [0])?);
        Ok(())
    })
    .unwrap();
    let mut dev = DefaultQubit::with_num_wires(1).unwrap();

    // the Hermitian matrix is trainable parameter 2
    let err = execute(&mut tape, &mut dev, Some(&[0.1, 0.2])).unwrap_err();
    assert!(matches!(err, GradError::NonScalarParameter(2)));

    tape.set_trainable_params([0, 1]).unwrap();
    let with_override = execute_flat(&mut tape, &mut dev, Some(&[0.1, 0.2])).unwrap();
    assert_eq!(tape.get_parameters(true), Param::reals(&[0.4, 0.2]));

    let mut fixed = Tape::build(|rec| {
        rec.apply(Operation::rx(0.1, 0))
            .apply(Operation::ry(0.2, 0))
            .expval(Observable::hermitian(herm.clone(), [0])?);
        Ok(())
    })
    .unwrap();
    let direct = execute_flat(&mut fixed, &mut dev, None).unwrap();
    assert!((with_override[0] - direct[0]).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Malformed device results
// ---------------------------------------------------------------------------

struct ShortDevice {
    caps: Capabilities,
}

impl Device for ShortDevice {
    fn name(&self) -> &str {
        "short"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn execute(&mut self, _tape: &Tape) -> HalResult<Vec<Array1<f64>>> {
        Ok(vec![Array1::zeros(3)])
    }
}

#[test]
fn malformed_results_are_rejected() {
    let mut dev = ShortDevice {
        caps: Capabilities::statevector_simulator("short", 2),
    };

    let mut tape = two_wire_tape(X, Y);
    assert!(matches!(
        execute(&mut tape, &mut dev, None),
        Err(GradError::ResultMismatch(_))
    ));

    let mut probs = Tape::build(|rec| {
        rec.probs([0, 1]);
        Ok(())
    })
    .unwrap();
    assert!(matches!(
        execute(&mut probs, &mut dev, None),
        Err(GradError::ResultMismatch(_))
    ));
}
