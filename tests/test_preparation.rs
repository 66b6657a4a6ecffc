//! Integration test: cleaned artifact → scaled, balanced train/test artifacts

use cicflow_prep::error::PrepError;
use cicflow_prep::pipeline::{PreparationStage, LABEL_HEADER};
use cicflow_prep::preprocessing::{
    ClassDictionary, ClassTarget, PreparationConfig, StandardScaler, ZeroVariancePolicy,
    CLASSES_FILE, SCALER_FILE, TEST_FEATURES_FILE, TEST_LABELS_FILE, TRAIN_FEATURES_FILE,
    TRAIN_LABELS_FILE,
};
use cicflow_prep::synthetic::{class_counts, UnmappedClassPolicy};
use cicflow_prep::utils::DataLoader;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 40 BENIGN, 12 DDoS, 8 Bot rows with two varying features
fn write_cleaned(path: &Path, constant_feature: bool) {
    let mut csv = String::from("flow_duration,fwd_packets,Label\n");
    for i in 0..60 {
        let label = if i < 40 {
            "BENIGN"
        } else if i < 52 {
            "DDoS"
        } else {
            "Bot"
        };
        let packets = if constant_feature { 3.0 } else { (i % 9) as f64 + 0.5 };
        writeln!(csv, "{},{},{}", i * 3, packets, label).unwrap();
    }
    fs::write(path, csv).unwrap();
}

fn targets() -> Vec<ClassTarget> {
    // Training split of 42 rows holds 28 BENIGN, 6 Bot, 8 DDoS
    vec![
        ClassTarget::labelled(0, 28, "BENIGN"),
        ClassTarget::labelled(1, 20, "Bot"),
        ClassTarget::labelled(2, 15, "DDoS"),
    ]
}

fn config(dir: &Path) -> PreparationConfig {
    let input = dir.join("CICIDS.csv");
    write_cleaned(&input, false);
    PreparationConfig::default()
        .with_input(input)
        .with_output_dir(dir.join("out"))
        .with_sampling_strategy(targets())
}

#[test]
fn test_run_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let report = PreparationStage::new(cfg.clone()).run().unwrap();

    assert_eq!(report.artifacts.len(), 6);
    for artifact in &report.artifacts {
        assert!(artifact.is_file(), "{} missing", artifact.display());
    }

    let loader = DataLoader::new();
    let (train_names, x_train) = loader.load_matrix(&cfg.artifact_path(TRAIN_FEATURES_FILE)).unwrap();
    let (test_names, x_test) = loader.load_matrix(&cfg.artifact_path(TEST_FEATURES_FILE)).unwrap();
    let y_train = loader.load_labels(&cfg.artifact_path(TRAIN_LABELS_FILE), LABEL_HEADER).unwrap();
    let y_test = loader.load_labels(&cfg.artifact_path(TEST_LABELS_FILE), LABEL_HEADER).unwrap();

    assert_eq!(train_names, vec!["flow_duration", "fwd_packets"]);
    assert_eq!(train_names, test_names);
    assert_eq!(x_train.nrows(), y_train.len());
    assert_eq!(x_test.nrows(), y_test.len());
    assert_eq!(y_test.len(), 18);
    assert_eq!(class_counts(&y_train), BTreeMap::from([(0, 28), (1, 20), (2, 15)]));

    let classes = ClassDictionary::load_json(&cfg.artifact_path(CLASSES_FILE)).unwrap();
    assert_eq!(classes.names(), &["BENIGN", "Bot", "DDoS"]);
}

#[test]
fn test_test_partition_is_stratified_and_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let stage = PreparationStage::new(config(dir.path()));
    let (data, report) = stage.prepare_table(stage.load_cleaned().unwrap()).unwrap();

    // 60 rows, 18 for test: 12 BENIGN, 2 Bot, 4 DDoS
    assert_eq!(class_counts(&data.y_test), BTreeMap::from([(0, 12), (1, 2), (2, 4)]));
    assert_eq!(report.before_balancing.iter().map(|c| c.count).collect::<Vec<_>>(), vec![28, 6, 8]);
    assert_eq!(report.after_balancing.iter().map(|c| c.count).collect::<Vec<_>>(), vec![28, 20, 15]);
    assert_eq!(report.n_synthetic, BTreeMap::from([(0, 0), (1, 14), (2, 7)]));
}

#[test]
fn test_scaler_uses_training_statistics_only() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let stage = PreparationStage::new(cfg.clone());
    let (data, _) = stage.prepare_table(stage.load_cleaned().unwrap()).unwrap();
    stage.persist(&data).unwrap();

    let stored = StandardScaler::load_json(&cfg.artifact_path(SCALER_FILE)).unwrap();
    assert_eq!(stored.params(), data.scaler.params());

    let balanced_train = stored.inverse_transform(&data.x_train).unwrap();
    let raw_test = stored.inverse_transform(&data.x_test).unwrap();

    let mut train_fit = StandardScaler::new();
    train_fit.fit(stored.features(), &balanced_train).unwrap();
    for (a, b) in train_fit.params().iter().zip(stored.params()) {
        assert!((a.center - b.center).abs() < 1e-9);
        assert!((a.scale - b.scale).abs() < 1e-9);
    }

    let mut test_fit = StandardScaler::new();
    test_fit.fit(stored.features(), &raw_test).unwrap();
    assert!(test_fit
        .params()
        .iter()
        .zip(stored.params())
        .any(|(a, b)| (a.center - b.center).abs() > 1e-6));

    // Scaled training features are centred; test features are not refit
    for column in data.x_train.columns() {
        assert!(column.mean().unwrap().abs() < 1e-9);
    }
}

#[test]
fn test_class_too_small_names_the_class() {
    let dir = tempfile::tempdir().unwrap();
    let stage = PreparationStage::new(config(dir.path()).with_k_neighbors(6));

    match stage.run() {
        Err(PrepError::ClassTooSmall { class, label, members, required }) => {
            assert_eq!(class, 1);
            assert_eq!(label, "Bot");
            assert_eq!(members, 6);
            assert_eq!(required, 7);
        }
        other => panic!("expected class too small, got {:?}", other),
    }
    assert!(!dir.path().join("out").join(TRAIN_FEATURES_FILE).exists());
}

#[test]
fn test_strategy_errors() {
    let dir = tempfile::tempdir().unwrap();
    let base = config(dir.path());

    let shrinking = base.clone().with_sampling_strategy(vec![
        ClassTarget::new(0, 10),
        ClassTarget::new(1, 20),
        ClassTarget::new(2, 15),
    ]);
    assert!(matches!(
        PreparationStage::new(shrinking).run(),
        Err(PrepError::TargetBelowCount { class: 0, target: 10, current: 28 })
    ));

    let mislabelled = base.clone().with_sampling_strategy(vec![
        ClassTarget::labelled(0, 28, "BENIGN"),
        ClassTarget::labelled(1, 20, "DDoS"),
        ClassTarget::labelled(2, 15, "Bot"),
    ]);
    assert!(matches!(
        PreparationStage::new(mislabelled).run(),
        Err(PrepError::ValidationError(_))
    ));

    let partial = base.with_sampling_strategy(vec![ClassTarget::new(1, 20)]);
    assert!(matches!(
        PreparationStage::new(partial.clone()).run(),
        Err(PrepError::UnmappedClass { class: 0, .. })
    ));
    let report = PreparationStage::new(partial.with_unmapped_classes(UnmappedClassPolicy::Keep))
        .run()
        .unwrap();
    assert_eq!(
        report.after_balancing.iter().map(|c| c.count).collect::<Vec<_>>(),
        vec![28, 20, 8]
    );
}

#[test]
fn test_zero_variance_feature_policies() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    write_cleaned(&cfg.input, true);

    let (data, _) = {
        let stage = PreparationStage::new(cfg.clone());
        stage.prepare_table(stage.load_cleaned().unwrap()).unwrap()
    };
    assert!(data.x_train.column(1).iter().all(|v| *v == 0.0));
    assert!(data.x_test.column(1).iter().all(|v| *v == 0.0));

    cfg = cfg.with_zero_variance(ZeroVariancePolicy::Fail);
    match PreparationStage::new(cfg).run() {
        Err(PrepError::DegenerateFeature(name)) => assert_eq!(name, "fwd_packets"),
        other => panic!("expected degenerate feature, got {:?}", other),
    }
}

#[test]
fn test_missing_cleaned_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = PreparationConfig::default().with_input(dir.path().join("CICIDS.csv"));
    assert!(matches!(
        PreparationStage::new(cfg).run(),
        Err(PrepError::MissingInputFile(_))
    ));
}
