//! Benchmarks for Jacobian strategies
//!
//! Run with: cargo bench -p qtape-grad

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use qtape_adapter_sim::DefaultQubit;
use qtape_grad::{DiffMethod, GradientEngine, JacobianOptions};
use qtape_ir::{Observable, Operation, Tape};

/// Layers of RX/RY rotations with a CNOT ladder, one ⟨Z⟩ per wire.
fn variational_tape(num_wires: u32, layers: usize) -> Tape {
    Tape::build(|rec| {
        for layer in 0..layers {
            for w in 0..num_wires {
                let base = (layer as f64) * 0.3 + f64::from(w) * 0.05;
                rec.apply(Operation::rx(base, w))
                    .apply(Operation::ry(base + 0.1, w));
            }
            for w in 0..num_wires.saturating_sub(1) {
                rec.apply(Operation::cnot(w, w + 1));
            }
        }
        for w in 0..num_wires {
            rec.expval(Observable::PauliZ(w.into()));
        }
        Ok(())
    })
    .unwrap()
}

fn bench_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian");

    for num_wires in &[2u32, 4, 8] {
        let tape = variational_tape(*num_wires, 3);
        let mut dev = DefaultQubit::with_num_wires(*num_wires).unwrap();

        for (label, method) in [
            ("numeric", DiffMethod::Numeric),
            ("reversible", DiffMethod::Analytic),
        ] {
            let options = JacobianOptions::new().with_method(method);
            group.bench_with_input(BenchmarkId::new(label, num_wires), &tape, |b, tape| {
                let mut engine = GradientEngine::reversible();
                let mut tape = tape.clone();
                b.iter(|| engine.jacobian(&mut tape, &mut dev, &options).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_jacobian);
criterion_main!(benches);
