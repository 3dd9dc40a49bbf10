//! Benchmarks for adjacency, validation and atlas generation.

use criterion::{criterion_group, criterion_main, Criterion};
use isochart::mesh::shapes;
use isochart::prelude::*;

fn bench_adjacency(c: &mut Criterion) {
    let sphere = shapes::uv_sphere(64, 32, 1.0);

    c.bench_function("adjacency_sphere_64x32", |b| {
        b.iter(|| build_adjacency(&sphere.mesh(), 0.0).unwrap());
    });

    c.bench_function("adjacency_sphere_64x32_weld", |b| {
        b.iter(|| build_adjacency(&sphere.mesh(), 1e-4).unwrap());
    });
}

fn bench_validation(c: &mut Criterion) {
    let sphere = shapes::uv_sphere(64, 32, 1.0);
    let adjacency = build_adjacency(&sphere.mesh(), 0.0).unwrap().adjacency;

    c.bench_function("validate_all_sphere_64x32", |b| {
        b.iter(|| validate_mesh(&sphere.mesh(), Some(&adjacency), ValidateFlags::all()).unwrap());
    });

    c.bench_function("normals_sphere_64x32", |b| {
        b.iter(|| compute_normals(&sphere.mesh(), NormalFlags::DEFAULT).unwrap());
    });
}

fn bench_atlas(c: &mut Criterion) {
    let mut group = c.benchmark_group("atlas");
    group.sample_size(10);

    let grid = shapes::grid(32, 16, 2.0, 1.0);
    let grid_adjacency = build_adjacency(&grid.mesh(), 0.0).unwrap().adjacency;
    group.bench_function("grid_32x16", |b| {
        b.iter(|| build_atlas(&grid.mesh(), &grid_adjacency, &AtlasOptions::default()).unwrap());
    });

    let sphere = shapes::uv_sphere(24, 12, 1.0);
    let sphere_adjacency = build_adjacency(&sphere.mesh(), 0.0).unwrap().adjacency;
    group.bench_function("sphere_24x12_parallel", |b| {
        b.iter(|| build_atlas(&sphere.mesh(), &sphere_adjacency, &AtlasOptions::default()).unwrap());
    });
    group.bench_function("sphere_24x12_sequential", |b| {
        let options = AtlasOptions::default().sequential();
        b.iter(|| build_atlas(&sphere.mesh(), &sphere_adjacency, &options).unwrap());
    });

    let part = partition(&sphere.mesh(), &sphere_adjacency, &AtlasOptions::default()).unwrap();
    group.bench_function("repack_sphere_1024", |b| {
        let options = PackOptions {
            width: 1024,
            height: 1024,
            gutter: 2.0,
        };
        b.iter(|| part.pack(&options).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_adjacency, bench_validation, bench_atlas);
criterion_main!(benches);
