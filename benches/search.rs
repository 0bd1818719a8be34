use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use networksecurity::training::{
    evaluate_models, Classifier, ModelKind, ParamGrid, ParamValue, SearchConfig, SearchSpec,
    SearchStrategy,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_phishing_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen_range(-1..=1) as f64);
    let y = Array1::from_iter(
        x.rows()
            .into_iter()
            .map(|r| if r[0] + r[1] - r[2] > 0.0 { 1.0 } else { 0.0 }),
    );
    (x, y)
}

fn catalog() -> Vec<SearchSpec> {
    vec![
        SearchSpec::new(
            "Decision Tree",
            ModelKind::DecisionTree,
            ParamGrid::new()
                .with("criterion", ["gini", "entropy"])
                .with("max_depth", [ParamValue::from(5i64), ParamValue::None]),
        ),
        SearchSpec::new(
            "Random Forest",
            ModelKind::RandomForest,
            ParamGrid::new().with("n_estimators", [16i64, 32]),
        ),
    ]
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let (x, y) = create_phishing_data(*n_rows, 30);
        let config = SearchConfig {
            strategy: SearchStrategy::Grid,
            ..SearchConfig::default()
        };

        group.bench_with_input(BenchmarkId::new("grid", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| evaluate_models(black_box(x), y, x, y, &catalog(), &config).unwrap())
        });
    }

    group.finish();
}

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    let (x, y) = create_phishing_data(5000, 30);
    for kind in [ModelKind::DecisionTree, ModelKind::RandomForest, ModelKind::GradientBoosting] {
        group.bench_function(BenchmarkId::new("classifier", kind), |b| {
            b.iter(|| {
                let mut model = Classifier::new(kind, 42);
                model.fit(black_box(&x), &y).unwrap();
                model
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_search, bench_forest_fit);
criterion_main!(benches);
