use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::DMatrix;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_transform::chain::Chain;
use mesh_transform::transform::{RootToken, Transform};

fn child(i: bool, j: bool) -> Transform {
    let offset = [if i { 0.5 } else { 0.0 }, if j { 0.5 } else { 0.0 }];
    Transform::scale_uniform(2, 0.5).add_offset(&offset).unwrap()
}

/// Root, `depth` random refinements of the unit square, then its bottom edge.
fn refined_boundary(depth: usize, seed: u64) -> Chain {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut chain = Chain::new(Transform::root(2, RootToken::from_raw(1)));
    for _ in 0..depth {
        // Lower children only, so every scale commutes with the edge.
        chain = chain.push(child(rng.r#gen(), false)).unwrap();
    }
    let bottom = Transform::linear(DMatrix::from_row_slice(2, 1, &[1.0, 0.0]), -1).unwrap();
    chain.push(bottom).unwrap()
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");

    for &depth in &[4usize, 16, 28] {
        let chain = refined_boundary(depth, 42);
        let points = DMatrix::from_fn(64, 1, |r, _| r as f64 / 63.0);

        group.bench_with_input(BenchmarkId::new("canonical", depth), &depth, |b, _| {
            b.iter(|| black_box(chain.canonical()));
        });

        let canon = chain.canonical();
        group.bench_with_input(BenchmarkId::new("prioritize", depth), &depth, |b, _| {
            b.iter(|| black_box(canon.prioritize(2)));
        });

        group.bench_with_input(BenchmarkId::new("apply", depth), &depth, |b, _| {
            b.iter(|| black_box(chain.apply(&points).unwrap()));
        });
    }

    group.bench_function("intern_hit", |b| {
        let keep = Transform::scale_uniform(3, 0.25);
        b.iter(|| black_box(Transform::scale_uniform(3, 0.25)));
        drop(keep);
    });

    group.finish();
}

criterion_group!(benches, bench_chain);
criterion_main!(benches);
