// Composition tests — the training pipeline feeding the inference service.
//
// These exercise the data flow between modules:
//   CSV -> LabeledExample -> split -> TF-IDF -> LogisticRegression
//       -> artifacts on disk -> InferenceService
// using a small synthetic Kreol corpus. Filesystem writes go to the
// system temp directory.

use std::path::{Path, PathBuf};

use kreol_toxicity::inference::{InferenceService, Label};
use kreol_toxicity::toxicity::artifacts::{
    artifact_files_present, ModelArtifacts, MODEL_FILE, VECTORIZER_FILE,
};
use kreol_toxicity::training::dataset::{read_examples, LabeledExample};
use kreol_toxicity::training::split::stratified_split;
use kreol_toxicity::training::{self, TrainingConfig};

const TOXIC_WORDS: [&str; 6] = ["kouyon", "malelve", "sal", "pourri", "zako", "bourik"];
const CLEAN_WORDS: [&str; 6] = ["bonzour", "mersi", "lakaz", "manze", "zoli", "kamarad"];
const SHARED_WORDS: [&str; 3] = ["to", "li", "sa"];

/// 50 toxic and 50 non-toxic rows; every word shows up in many rows but no
/// word is in more than 90% of them.
fn balanced_examples() -> Vec<LabeledExample> {
    let mut examples = Vec::new();
    for i in 0..50 {
        let toxic = format!(
            "{} {} {}",
            SHARED_WORDS[i % 3],
            TOXIC_WORDS[i % 6],
            TOXIC_WORDS[(i / 6 + 1) % 6].to_uppercase()
        );
        let clean = format!(
            "  {} {} {}",
            SHARED_WORDS[(i + 1) % 3],
            CLEAN_WORDS[i % 6],
            CLEAN_WORDS[(i / 6 + 2) % 6]
        );
        examples.push(LabeledExample {
            text: toxic,
            label: Label::Toxic,
        });
        examples.push(LabeledExample {
            text: clean,
            label: Label::NonToxic,
        });
    }
    examples
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kreol-toxicity-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn write_csv(dir: &Path, examples: &[LabeledExample]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("data.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(["text", "label"]).unwrap();
    for e in examples {
        writer.write_record([e.text.as_str(), e.label.as_str()]).unwrap();
    }
    writer.flush().unwrap();
    path
}

// ============================================================
// Stratified split
// ============================================================

#[test]
fn balanced_hundred_rows_split_ten_and_ten() {
    let examples = balanced_examples();
    let split = stratified_split(&examples, |e| e.label, 0.2, 42).unwrap();

    assert_eq!(split.train.len(), 80);
    assert_eq!(split.test.len(), 20);

    let test_toxic = split.test.iter().filter(|e| e.label.is_toxic()).count();
    let test_clean = split.test.len() - test_toxic;
    assert_eq!(test_toxic, 10);
    assert_eq!(test_clean, 10);

    let train_toxic = split.train.iter().filter(|e| e.label.is_toxic()).count();
    assert_eq!(train_toxic, 40);
}

#[test]
fn imbalanced_split_preserves_proportions_within_one_row() {
    let mut examples = balanced_examples();
    // Drop 30 toxic rows: 20 toxic / 50 clean.
    let mut dropped = 0;
    examples.retain(|e| {
        if e.label.is_toxic() && dropped < 30 {
            dropped += 1;
            false
        } else {
            true
        }
    });

    let split = stratified_split(&examples, |e| e.label, 0.2, 42).unwrap();
    assert_eq!(split.test.len(), 14);
    let test_toxic = split.test.iter().filter(|e| e.label.is_toxic()).count() as f64;
    let expected = 14.0 * 20.0 / 70.0;
    assert!((test_toxic - expected).abs() <= 1.0, "got {test_toxic}, expected ~{expected}");
}

// ============================================================
// Train -> evaluate -> predict
// ============================================================

#[test]
fn trained_model_separates_the_classes() {
    let outcome = training::train(&balanced_examples(), &TrainingConfig::default()).unwrap();

    assert_eq!(outcome.train_rows, 80);
    assert_eq!(outcome.test_rows, 20);
    assert_eq!(outcome.report.total(), 20);
    assert!(outcome.artifacts.classifier.converged);
    assert!(
        outcome.report.accuracy >= 0.9,
        "accuracy {}",
        outcome.report.accuracy
    );

    let service = InferenceService::new(outcome.artifacts);
    assert_eq!(service.predict("to KOUYON malelve").label, Label::Toxic);
    assert_eq!(service.predict("Bonzour mersi lakaz").label, Label::NonToxic);
}

#[test]
fn vocabulary_comes_from_train_split_only() {
    let mut examples = balanced_examples();
    // Two rows with a unique word; if both land in test, it must not be learned.
    let config = TrainingConfig::default();
    examples.push(LabeledExample {
        text: "ranplasan ranplasan".to_string(),
        label: Label::NonToxic,
    });
    examples.push(LabeledExample {
        text: "ranplasan".to_string(),
        label: Label::NonToxic,
    });

    let split = stratified_split(
        &examples
            .iter()
            .map(|e| LabeledExample {
                text: kreol_toxicity::preprocess::preprocess(&e.text),
                label: e.label,
            })
            .collect::<Vec<_>>(),
        |e| e.label,
        config.test_size,
        config.seed,
    )
    .unwrap();
    let in_train = split
        .train
        .iter()
        .filter(|e| e.text.contains("ranplasan"))
        .count();

    let outcome = training::train(&examples, &config).unwrap();
    let learned = outcome.artifacts.vectorizer.index_of("ranplasan").is_some();
    assert_eq!(learned, in_train >= 2);
}

#[test]
fn training_run_persists_loadable_artifacts() {
    let dir = temp_dir("persist");
    let data_path = write_csv(&dir, &balanced_examples());
    let model_dir = dir.join("model");

    let config = TrainingConfig {
        data_path,
        model_dir: model_dir.clone(),
        ..TrainingConfig::default()
    };
    let outcome = training::run(&config).unwrap();

    assert!(artifact_files_present(&model_dir));
    let service = InferenceService::load(&model_dir).unwrap();

    let fresh = InferenceService::new(outcome.artifacts);
    for text in ["to kouyon zako", "bonzour kamarad", "", "hello world"] {
        assert_eq!(service.predict(text), fresh.predict(text), "{text}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_label_fails_before_fitting() {
    let dir = temp_dir("spam-label");
    std::fs::create_dir_all(&dir).unwrap();
    let data_path = dir.join("data.csv");
    std::fs::write(
        &data_path,
        "text,label\nto kouyon,toxic\nbonzour,non_toxic\nbuy now,spam\n",
    )
    .unwrap();
    let model_dir = dir.join("model");

    let config = TrainingConfig {
        data_path,
        model_dir: model_dir.clone(),
        ..TrainingConfig::default()
    };
    let err = training::run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("spam"));
    assert!(!model_dir.exists(), "nothing should be written on failure");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn csv_labels_map_to_classes() {
    let csv = "text,label\nTo KOUYON,toxic\n bonzour ,non_toxic\n";
    let examples = read_examples(csv.as_bytes()).unwrap();
    assert_eq!(examples[0].label.class_index(), 1);
    assert_eq!(examples[1].label.class_index(), 0);
    // Loading keeps raw text; preprocessing happens in the pipeline.
    assert_eq!(examples[1].text, " bonzour ");
}

// ============================================================
// Artifact loading failures
// ============================================================

#[test]
fn missing_artifacts_fail_to_load() {
    let dir = temp_dir("missing");
    let err = InferenceService::load(&dir).err().unwrap();
    assert!(err.to_string().contains("kreol-toxicity train"));
}

#[test]
fn preprocess_version_mismatch_fails_to_load() {
    let dir = temp_dir("version");
    let outcome = training::train(&balanced_examples(), &TrainingConfig::default()).unwrap();
    outcome.artifacts.save(&dir).unwrap();

    let path = dir.join(MODEL_FILE);
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["preprocess_version"] = serde_json::json!(999);
    std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    let err = ModelArtifacts::load(&dir).unwrap_err();
    assert!(format!("{err:#}").contains("preprocessing v999"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_vectorizer_fails_to_load() {
    let dir = temp_dir("corrupt");
    let outcome = training::train(&balanced_examples(), &TrainingConfig::default()).unwrap();
    outcome.artifacts.save(&dir).unwrap();
    std::fs::write(dir.join(VECTORIZER_FILE), "{ not json").unwrap();

    assert!(ModelArtifacts::load(&dir).is_err());

    let _ = std::fs::remove_dir_all(&dir);
}
