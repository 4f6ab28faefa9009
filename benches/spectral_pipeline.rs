use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use igsgraph::spectral::NormalizedLaplacianBuilder;
use igsgraph::transform::full_graph;
use igsgraph::{laplacian_positional_encoding, wl_positional_encoding, GraphRecord};

fn random_record(nodes: usize, probability: f64, seed: u64) -> GraphRecord {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut edges = Vec::new();
    for i in 0..nodes {
        for j in (i + 1)..nodes {
            if rng.gen_bool(probability) {
                edges.push((i, j));
                edges.push((j, i));
            }
        }
    }
    GraphRecord::with_unit_features(nodes, &edges, 0)
}

fn bench_spectral_pipeline(c: &mut Criterion) {
    let graph_small = random_record(64, 0.15, 42);
    let graph_medium = random_record(256, 0.08, 7);

    let mut group = c.benchmark_group("spectral_pipeline");

    group.bench_function("laplacian_64", |b| {
        b.iter(|| black_box(NormalizedLaplacianBuilder::build(&graph_small)));
    });

    group.bench_function("lap_pe_64", |b| {
        b.iter(|| {
            let pe = laplacian_positional_encoding(&graph_small, 8).expect("encoding");
            black_box(pe);
        });
    });

    group.bench_function("lap_pe_256", |b| {
        b.iter(|| {
            let pe = laplacian_positional_encoding(&graph_medium, 8).expect("encoding");
            black_box(pe);
        });
    });

    group.bench_function("wl_256", |b| {
        b.iter(|| black_box(wl_positional_encoding(&graph_medium)));
    });

    group.bench_function("full_graph_64", |b| {
        b.iter(|| black_box(full_graph(&graph_small)));
    });

    group.finish();
}

criterion_group!(benches, bench_spectral_pipeline);
criterion_main!(benches);
