//! Benchmarks for the single-transaction scoring path.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use data_validator::{TransactionRecord, TransactionStatus};
use feature_engine::{FeatureSpec, FeatureVector, FittedScaler, FrozenStatistics, TransactionContext};
use inference_engine::{ArtifactBundle, ForestConfig, RandomForest, Scorer, TrainedClassifier};

fn synthetic_bundle(n_trees: usize) -> Scorer {
    let spec = FeatureSpec::current();
    let frozen = FrozenStatistics {
        spec_version: spec.version(),
        high_amount_quantile: 0.95,
        high_amount_threshold: 40_000.0,
        median_gap_seconds: 900.0,
    };

    let vectors: Vec<FeatureVector> = (0..500)
        .map(|i| {
            let amount = 50.0 + (i * 97 % 5_000) as f64 * 10.0;
            FeatureVector::new(
                spec.version(),
                vec![
                    amount.ln_1p(),
                    (i % 13 + 1) as f64,
                    (i % 7 + 1) as f64,
                    (i * 37 % 3_600) as f64,
                    (amount > frozen.high_amount_threshold) as u8 as f64,
                    (i % 9 == 0) as u8 as f64,
                ],
            )
        })
        .collect();
    let labels: Vec<bool> = vectors.iter().map(|v| v.values[4] > 0.0 && v.values[5] > 0.0).collect();

    let scaler = FittedScaler::fit(spec, frozen, &vectors).unwrap();
    let scaled: Vec<Vec<f64>> = vectors.iter().map(|v| scaler.transform(v).unwrap().values).collect();
    let forest = RandomForest::fit(
        ForestConfig {
            n_trees,
            ..Default::default()
        },
        &scaled,
        &labels,
    )
    .unwrap();

    let classifier = TrainedClassifier::from_forest(spec.version(), forest);
    let bundle = ArtifactBundle::new(spec.version(), scaler, classifier)
        .validate(spec)
        .unwrap();
    Scorer::from_bundle(bundle)
}

fn benchmark_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let record = TransactionRecord::new(
        12_500.0,
        "alice@upi",
        "bob@upi",
        TransactionStatus::Success,
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    );
    let context = TransactionContext {
        sender_count: 4,
        receiver_count: 2,
        previous_sender_timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 40, 0).unwrap()),
    };

    for n_trees in [10, 50, 150] {
        let scorer = synthetic_bundle(n_trees);
        group.bench_with_input(BenchmarkId::new("trees", n_trees), &n_trees, |b, _| {
            b.iter(|| scorer.score(black_box(&record), black_box(&context)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_score);
criterion_main!(benches);
