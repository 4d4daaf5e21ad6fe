//! Benchmarks for tape construction and manipulation
//!
//! Run with: cargo bench -p qtape-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qtape_ir::{ExpandOptions, Observable, Operation, Tape};

/// A layered circuit of Rot gates and a CNOT ladder.
fn layered_tape(num_wires: u32, layers: usize) -> Tape {
    Tape::build(|rec| {
        for layer in 0..layers {
            for w in 0..num_wires {
                let base = (layer as f64) * 0.1 + f64::from(w) * 0.01;
                rec.apply(Operation::rot(base, base + 0.2, base + 0.4, w));
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

fn bench_tape_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tape_construction");

    for num_wires in &[2u32, 5, 10, 20] {
        group.bench_with_input(
            BenchmarkId::new("layered", num_wires),
            num_wires,
            |b, &n| {
                b.iter(|| layered_tape(black_box(n), black_box(4)));
            },
        );
    }

    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");

    for num_wires in &[2u32, 5, 10] {
        let tape = layered_tape(*num_wires, 4);
        group.bench_with_input(BenchmarkId::new("depth_2", num_wires), &tape, |b, tape| {
            b.iter(|| {
                tape.expand(&ExpandOptions::default().with_depth(2))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    for num_wires in &[5u32, 10, 20] {
        let tape = layered_tape(*num_wires, 4);
        group.bench_with_input(BenchmarkId::new("build", num_wires), &tape, |b, tape| {
            b.iter(|| {
                let mut fresh = tape.clone();
                fresh.inv();
                black_box(fresh.graph().num_edges())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tape_construction, bench_expand, bench_graph);
criterion_main!(benches);
