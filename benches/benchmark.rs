// Fit and query benchmarks for blendrec
use blendrec::prelude::*;
use blendrec::{FeatureEncoder, NeighborIndex, Vector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

const CATEGORIES: [&str; 6] = ["Laptops", "Phones", "Audio", "Cameras", "Tablets", "Monitors"];

fn generate_catalog(size: usize, seed: u64) -> Vec<Product> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size as u64)
        .map(|i| {
            let category = CATEGORIES[rng.random_range(0..CATEGORIES.len())];
            Product::new(i, category)
                .with_title(format!("{} item {}", category, i))
                .with_price(rng.random_range(10.0..2000.0))
                .with_rating(rng.random_range(1.0..5.0))
        })
        .collect()
}

fn benchmark_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        let catalog = generate_catalog(*size, 42);
        group.bench_with_input(BenchmarkId::new("snapshot", size), size, |b, _| {
            let engine = Engine::new(EngineConfig::default()).unwrap();
            b.iter(|| engine.fit(black_box(catalog.clone())).unwrap());
        });
    }

    group.finish();
}

fn benchmark_neighbor_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("neighbor_scan");

    for size in [1000, 10000].iter() {
        let catalog = generate_catalog(*size, 7);
        let encoder = FeatureEncoder::fit(&catalog, &Default::default()).unwrap();
        let vectors: Vec<Vector> = catalog.iter().map(|p| encoder.encode_product(p)).collect();
        let query = vectors[0].clone();
        let index = NeighborIndex::build(vectors, Metric::Cosine).unwrap();

        group.bench_with_input(BenchmarkId::new("cosine", size), size, |b, _| {
            b.iter(|| index.query(black_box(&query), 10).unwrap());
        });
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    let engine = Engine::new(EngineConfig::default()).unwrap();
    engine.fit(generate_catalog(1000, 42)).unwrap();

    let mut history = MemoryHistory::new();
    for id in [3u64, 17, 256, 511] {
        history.like("bench", id);
    }
    let profile = ProfileQuery::new(450.0, 4.1, "Audio");

    group.bench_function("item", |b| {
        b.iter(|| engine.recommend_for_item(black_box(&ProductId::from(10u64)), 5).unwrap());
    });
    group.bench_function("user", |b| {
        b.iter(|| engine.recommend_for_user(&history, black_box("bench"), 5).unwrap());
    });
    group.bench_function("profile", |b| {
        b.iter(|| engine.recommend_for_profile(black_box(&profile), 5).unwrap());
    });
    group.bench_function("consensus", |b| {
        b.iter(|| engine.recommend_by_consensus(black_box(&profile), 5, Some(1)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, benchmark_fit, benchmark_neighbor_scan, benchmark_recommend);
criterion_main!(benches);
