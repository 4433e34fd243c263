//! Benchmarks for the interval-overlap mapper and the full rebin pipeline.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use dobson::{rebin, DimensionType, OverlapMap, Product, Variable};

/// Contiguous interval bounds [i * width, (i + 1) * width] for n intervals
fn contiguous_bounds(name: &str, n: usize, width: f64) -> Variable {
    let mut values = Vec::with_capacity(n * 2);
    for i in 0..n {
        values.push(i as f64 * width);
        values.push((i + 1) as f64 * width);
    }
    Variable::double(
        name,
        Some("m"),
        vec![DimensionType::Vertical, DimensionType::Independent],
        &[n, 2],
        values,
    )
    .unwrap()
}

fn profile_product(num_times: usize, num_levels: usize) -> Product {
    let mut product = Product::new();
    product
        .add_variable(contiguous_bounds("altitude_bounds", num_levels, 100.0))
        .unwrap();
    product
        .add_variable(
            Variable::double(
                "extinction_coefficient",
                Some("1/m"),
                vec![DimensionType::Time, DimensionType::Vertical],
                &[num_times, num_levels],
                (0..num_times * num_levels).map(|v| v as f64).collect(),
            )
            .unwrap(),
        )
        .unwrap();
    product
}

fn bench_overlap_map(c: &mut Criterion) {
    let source = contiguous_bounds("altitude_bounds", 1000, 30.0);
    let target = contiguous_bounds("altitude_bounds", 800, 37.5);

    c.bench_function("overlap_map_1000x800", |b| {
        b.iter(|| OverlapMap::build(black_box(&target), black_box(&source), 1).unwrap())
    });
}

fn bench_rebin_profile(c: &mut Criterion) {
    let product = profile_product(500, 200);
    let target = contiguous_bounds("altitude_bounds", 120, 166.0);

    c.bench_function("rebin_500x200_to_120", |b| {
        b.iter_batched(
            || product.clone(),
            |mut product| rebin(&mut product, black_box(&target)).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_overlap_map, bench_rebin_profile);
criterion_main!(benches);
