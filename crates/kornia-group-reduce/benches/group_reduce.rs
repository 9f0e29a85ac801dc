use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kornia_group_reduce::*;

fn cpu_min(input: &[u32], problem_size: usize) -> Vec<u32> {
    input
        .chunks(problem_size)
        .map(|s| s.iter().copied().fold(u32::MAX, u32::min))
        .collect()
}

fn bench_segment_min(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_min");
    group.sample_size(10);

    for problem_size in [5usize, 32, 71, 256].iter() {
        let nsegments = 64;
        let input: Vec<u32> = (0..nsegments * problem_size)
            .map(|i| ((i * 2654435761) % 1000) as u32)
            .collect();
        let geometry = BlockGeometry::for_problem(4, *problem_size, DEFAULT_LANE_WIDTH);
        let op = Min::default();

        group.bench_with_input(
            BenchmarkId::new("sequential", problem_size),
            problem_size,
            |bench, &size| {
                bench.iter(|| black_box(cpu_min(black_box(&input), size)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("emulated", problem_size),
            problem_size,
            |bench, &size| {
                bench.iter(|| {
                    let result = segment_reduce(black_box(&input), size, &geometry, &op).unwrap();
                    black_box(result);
                });
            },
        );

        let shared_only = BlockGeometry::shared_memory_only(geometry.rows, geometry.cols);
        group.bench_with_input(
            BenchmarkId::new("emulated_shared_only", problem_size),
            problem_size,
            |bench, &size| {
                bench.iter(|| {
                    let result =
                        segment_reduce(black_box(&input), size, &shared_only, &op).unwrap();
                    black_box(result);
                });
            },
        );
    }
    group.finish();
}

#[cfg(any(feature = "cuda", feature = "wgpu"))]
fn bench_segment_min_gpu(c: &mut Criterion) {
    #[cfg(feature = "cuda")]
    let runtime = init_cuda_runtime();
    #[cfg(all(feature = "wgpu", not(feature = "cuda")))]
    let runtime = init_wgpu_runtime();

    let Ok(runtime) = runtime else {
        println!("GPU not available, skipping benchmarks");
        return;
    };

    let mut group = c.benchmark_group("segment_min_gpu");
    for problem_size in [32usize, 256, 1024].iter() {
        let nsegments = 4096;
        let input: Vec<u32> = (0..nsegments * problem_size)
            .map(|i| ((i * 2654435761) % 1000) as u32)
            .collect();
        let input_gpu = to_device(&input, vec![nsegments, *problem_size], &runtime).unwrap();
        let geometry = BlockGeometry::default();

        group.bench_with_input(
            BenchmarkId::new("gpu", problem_size),
            problem_size,
            |bench, &size| {
                bench.iter(|| {
                    let result = segment_reduce_execute::<_, u32, MinOp>(
                        black_box(&input_gpu),
                        size,
                        &geometry,
                        &runtime,
                    )
                    .unwrap();
                    black_box(result);
                });
            },
        );
    }
    group.finish();
}

#[cfg(any(feature = "cuda", feature = "wgpu"))]
criterion_group!(benches, bench_segment_min, bench_segment_min_gpu);

#[cfg(not(any(feature = "cuda", feature = "wgpu")))]
criterion_group!(benches, bench_segment_min);

criterion_main!(benches);
