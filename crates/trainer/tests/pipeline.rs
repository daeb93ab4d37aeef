//! End-to-end training and scoring scenarios

use chrono::{DateTime, Duration, TimeZone, Utc};
use data_validator::{RawAmount, TransactionRecord, TransactionStatus};
use feature_engine::{FeatureError, FeatureSpec, RunningAggregate, TransactionContext};
use inference_engine::{
    ArtifactBundle, BundleMismatchError, ClassifierModel, ForestConfig, Scorer, ThresholdRule,
    TrainedClassifier,
};
use resampler::SkipReason;
use storage::{read_labeled_csv, BundleStore, LabeledRecord};
use trainer::{Trainer, TrainingConfig, TrainingError};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn labeled(row: usize, record: TransactionRecord, is_fraud: bool) -> LabeledRecord {
    LabeledRecord {
        row,
        record,
        is_fraud,
    }
}

/// 400 ordinary payments and 40 fraudulent ones; `amount_scale` stretches every amount
fn history(amount_scale: f64) -> Vec<LabeledRecord> {
    let mut batch = Vec::new();
    for i in 0..400 {
        let status = if i % 25 == 0 {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Success
        };
        let record = TransactionRecord::new(
            (100.0 + (i * 37 % 4_900) as f64) * amount_scale,
            format!("user{}@upi", i % 100),
            format!("shop{}@upi", i % 50),
            status,
            base() + Duration::seconds((i * 7_919 % 100_000) as i64),
        );
        batch.push(labeled(batch.len(), record, false));
    }
    for i in 0..40 {
        let status = if i % 2 == 0 {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Success
        };
        let record = TransactionRecord::new(
            (60_000.0 + (i * 2_000) as f64) * amount_scale,
            format!("mule{}@upi", i % 5),
            format!("drop{}@upi", i % 4),
            status,
            base() + Duration::seconds(50 * i as i64),
        );
        batch.push(labeled(batch.len(), record, true));
    }
    batch
}

fn config() -> TrainingConfig {
    TrainingConfig {
        forest: ForestConfig {
            n_trees: 40,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn request(amount: f64, status: TransactionStatus) -> TransactionRecord {
    TransactionRecord::new(amount, "new@upi", "shop1@upi", status, base() + Duration::days(2))
}

fn context(sender: u64, receiver: u64, gap_secs: i64) -> TransactionContext {
    TransactionContext {
        sender_count: sender,
        receiver_count: receiver,
        previous_sender_timestamp: Some(base() + Duration::days(2) - Duration::seconds(gap_secs)),
    }
}

#[test]
fn test_training_produces_consistent_bundle() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let report = &run.report;

    assert_eq!(report.samples, 440);
    assert_eq!(report.fraud_samples, 40);
    assert_eq!(report.train_samples + report.test_samples, 440);
    assert_eq!(report.test_samples, 88);
    assert!(report.synthesized > 0);
    assert_eq!(report.correction_skipped, None);
    assert!(report.metrics.is_some());

    assert_eq!(run.bundle.scaler.feature_count(), 6);
    assert_eq!(run.bundle.classifier.feature_count(), 6);
    assert!(run.bundle.clone().validate_registered().is_ok());
}

#[test]
fn test_ordinary_transaction_is_not_fraud() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let scorer = Scorer::from_bundle(run.bundle.validate(FeatureSpec::current()).unwrap());

    let outcome = scorer
        .score(&request(1_000.0, TransactionStatus::Success), &context(3, 5, 120))
        .unwrap();
    assert!(!outcome.is_fraud, "probability {}", outcome.fraud_probability);
}

#[test]
fn test_fraud_pattern_is_flagged() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let scorer = Scorer::from_bundle(run.bundle.validate(FeatureSpec::current()).unwrap());

    let outcome = scorer
        .score(&request(95_000.0, TransactionStatus::Failed), &context(8, 10, 50))
        .unwrap();
    assert!(outcome.is_fraud, "probability {}", outcome.fraud_probability);
}

#[test]
fn test_missing_amount_is_rejected_by_scorer() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let scorer = Scorer::from_bundle(run.bundle.validate(FeatureSpec::current()).unwrap());

    let mut record = request(1_000.0, TransactionStatus::Success);
    record.amount = None;
    let err = scorer.score(&record, &context(3, 5, 120)).unwrap_err();
    assert_eq!(err.validation().map(|e| e.fields()), Some(vec!["amount"]));
}

#[test]
fn test_short_classifier_is_rejected_before_scoring() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let rule = ThresholdRule::new(5, 0, 0.0).unwrap();
    let classifier = TrainedClassifier::new(
        FeatureSpec::current().version(),
        0.5,
        ClassifierModel::ThresholdRule(rule),
    )
    .unwrap();
    let bundle = ArtifactBundle::new(FeatureSpec::current().version(), run.bundle.scaler, classifier);

    assert!(matches!(
        bundle.validate(FeatureSpec::current()),
        Err(BundleMismatchError::FeatureCount {
            component: "classifier",
            expected: 6,
            actual: 5,
            ..
        })
    ));
}

#[test]
fn test_high_amount_threshold_is_frozen_at_training() {
    let small = Trainer::new(config()).train(&history(1.0)).unwrap();
    let large = Trainer::new(config()).train(&history(10.0)).unwrap();
    let small_threshold = small.report.frozen.high_amount_threshold;
    let large_threshold = large.report.frozen.high_amount_threshold;
    assert!(small_threshold < large_threshold);

    let amount = (small_threshold + large_threshold) / 2.0;
    let record = request(amount, TransactionStatus::Success);
    let spec = FeatureSpec::current();

    let small = small.bundle.validate(spec).unwrap();
    let large = large.bundle.validate(spec).unwrap();

    // Serving populations differ wildly; the flag only follows the bundle
    for ctx in [context(1, 1, 10), context(500, 900, 86_400)] {
        let a = small.builder().build(&record, &ctx).unwrap();
        let b = large.builder().build(&record, &ctx).unwrap();
        assert_eq!(a.get(spec, "Is High Amount").unwrap(), 1.0);
        assert_eq!(b.get(spec, "Is High Amount").unwrap(), 0.0);
    }
}

#[test]
fn test_first_seen_sender_uses_training_median_gap() {
    let run = Trainer::new(config()).train(&history(1.0)).unwrap();
    let median_gap = run.report.frozen.median_gap_seconds;
    let bundle = run.bundle.validate(FeatureSpec::current()).unwrap();

    let aggregate = RunningAggregate::new();
    let vector = bundle
        .builder()
        .build(&request(500.0, TransactionStatus::Success), &aggregate)
        .unwrap();
    assert_eq!(
        vector.get(FeatureSpec::current(), "Time Diff Between Transactions").unwrap(),
        median_gap
    );
}

#[test]
fn test_invalid_row_aborts_with_index() {
    let mut batch = history(1.0);
    batch[3].record.amount = Some(RawAmount::Text("12k".to_string()));
    batch[3].record.timestamp = Some("yesterday".to_string());
    match Trainer::new(config()).train(&batch) {
        Err(TrainingError::InvalidRecord { row, source }) => {
            assert_eq!(row, 3);
            assert_eq!(source.fields(), vec!["amount", "timestamp"]);
        }
        other => panic!("expected invalid record, got {:?}", other.map(|r| r.report)),
    }
}

#[test]
fn test_constant_feature_aborts_training() {
    let mut batch = history(1.0);
    for labeled in &mut batch {
        labeled.record.status = Some("SUCCESS".to_string());
    }
    match Trainer::new(config()).train(&batch) {
        Err(TrainingError::Feature(FeatureError::DegenerateFeature { feature })) => {
            assert_eq!(feature, "Status")
        }
        other => panic!("expected degenerate feature, got {:?}", other.map(|r| r.report)),
    }
}

#[test]
fn test_single_fraud_row_skips_correction() {
    let mut batch: Vec<LabeledRecord> = history(1.0).into_iter().take(200).collect();
    let fraud = history(1.0).pop().unwrap();
    batch.push(labeled(batch.len(), fraud.record, true));

    // Everything stays in the training split, so the lone fraud row is seen by SMOTE
    let config = TrainingConfig {
        test_ratio: 0.0,
        ..config()
    };
    let run = Trainer::new(config).train(&batch).unwrap();
    assert_eq!(run.report.synthesized, 0);
    assert_eq!(run.report.test_samples, 0);
    assert_eq!(
        run.report.correction_skipped,
        Some(SkipReason::TooFewMinority { count: 1 })
    );
}

#[test]
fn test_csv_to_bundle_file_to_scorer() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("history.csv");

    let mut csv = String::from("Transaction ID,Timestamp,Sender UPI ID,Receiver UPI ID,Amount (INR),Status,is_fraud\n");
    for (i, labeled) in history(1.0).iter().enumerate() {
        let r = &labeled.record;
        csv.push_str(&format!(
            "T{},{},{},{},{},{},{}\n",
            i,
            r.timestamp.as_deref().unwrap(),
            r.sender_id.as_deref().unwrap(),
            r.receiver_id.as_deref().unwrap(),
            r.amount.as_ref().unwrap(),
            r.status.as_deref().unwrap(),
            labeled.is_fraud as u8,
        ));
    }
    std::fs::write(&csv_path, csv).unwrap();

    let batch = read_labeled_csv(&csv_path).unwrap();
    assert_eq!(batch.len(), 440);
    let run = Trainer::new(config()).train(&batch).unwrap();

    let store = BundleStore::new(dir.path().join("bundle.bin"));
    store.save(&run.bundle).unwrap();
    let loaded = store.load().unwrap().validate_registered().unwrap();
    assert_eq!(loaded.bundle_id(), run.bundle.bundle_id);

    let scorer = Scorer::from_bundle(loaded);
    let aggregate = RunningAggregate::new();
    let outcome = scorer
        .score_and_observe(&request(1_000.0, TransactionStatus::Success), &aggregate)
        .unwrap();
    assert_eq!(outcome.bundle_id, run.bundle.bundle_id);
    assert_eq!(aggregate.sender_count(), 1);
}
