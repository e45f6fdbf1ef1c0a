use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;

use slicer::{builder::MeshBuilder, plane::Plane, slicer::Slicer};

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Plane Slicing");
    let slicer = Slicer::default();

    for detail in [16, 64, 256] {
        let mut builder = MeshBuilder::with_attributes(true, true);
        builder.add_uv_sphere(Vector3::zeros(), 1.0, detail, detail * 2);
        let mesh = builder.build();

        let plane = Plane::from_normal_and_point(Vector3::new(0.3, 1.0, 0.2), Vector3::new(0.0, 0.1, 0.0))
            .unwrap();
        let name = format!("{} faces", mesh.face_count());

        group.bench_with_input(BenchmarkId::new("Single", &name), &mesh, |b, mesh| {
            b.iter(|| slicer.slice(mesh, &plane))
        });

        let jobs = (0..8)
            .map(|i| {
                let offset = i as f32 / 8.0 - 0.5;
                let plane = Plane::from_normal_and_point(Vector3::y(), Vector3::y() * offset).unwrap();
                (mesh.clone(), plane)
            })
            .collect::<Vec<_>>();

        group.bench_with_input(BenchmarkId::new("Parallel x8", &name), &jobs, |b, jobs| {
            b.iter(|| slicer.slice_many(jobs))
        });
    }
}

criterion_group!(benches, bench);
criterion_main!(benches);
