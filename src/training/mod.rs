// Training pipeline — labeled CSV in, two model artifacts out.
//
// Steps: load and map labels, preprocess, stratified split, fit the
// vectorizer on the train split only, fit the classifier, evaluate on the
// test split, persist. This is an offline batch job: the first error stops
// the run and nothing is written.

pub mod dataset;
pub mod evaluation;
pub mod split;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::features::{TfidfVectorizer, VectorizerParams};
use crate::inference::{InferenceService, Label};
use crate::preprocess::preprocess;
use crate::toxicity::artifacts::{default_model_dir, ModelArtifacts};
use crate::toxicity::classifier::{LogisticRegression, TrainParams};

use dataset::LabeledExample;
use evaluation::EvaluationReport;

/// Everything a training run needs.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub model_dir: PathBuf,
    pub test_size: f64,
    pub seed: u64,
    pub vectorizer: VectorizerParams,
    pub classifier: TrainParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/kreol_toxicity.csv"),
            model_dir: default_model_dir(),
            test_size: 0.2,
            seed: 42,
            vectorizer: VectorizerParams::default(),
            classifier: TrainParams::default(),
        }
    }
}

/// The fitted artifacts plus what the run measured.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub artifacts: ModelArtifacts,
    pub report: EvaluationReport,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Run the full pipeline from `config.data_path` and save the artifacts.
pub fn run(config: &TrainingConfig) -> Result<TrainingOutcome> {
    let examples = dataset::load_csv(&config.data_path)?;
    let outcome = train(&examples, config)?;
    outcome.artifacts.save(&config.model_dir)?;
    Ok(outcome)
}

/// Fit and evaluate on in-memory examples without touching the disk.
pub fn train(examples: &[LabeledExample], config: &TrainingConfig) -> Result<TrainingOutcome> {
    let normalized: Vec<LabeledExample> = examples
        .iter()
        .map(|e| LabeledExample {
            text: preprocess(&e.text),
            label: e.label,
        })
        .collect();

    let split = split::stratified_split(&normalized, |e| e.label, config.test_size, config.seed)?;
    info!(
        train = split.train.len(),
        test = split.test.len(),
        seed = config.seed,
        "Split training data"
    );

    let train_texts: Vec<String> = split.train.iter().map(|e| e.text.clone()).collect();
    let vectorizer = TfidfVectorizer::fit(&train_texts, config.vectorizer)?;

    let rows: Vec<_> = train_texts.iter().map(|t| vectorizer.transform(t)).collect();
    let targets: Vec<bool> = split.train.iter().map(|e| e.label.is_toxic()).collect();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} Fitting classifier on {msg} rows ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(rows.len().to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let fitted = LogisticRegression::fit(&rows, &targets, vectorizer.n_features(), config.classifier);
    spinner.finish_and_clear();
    let classifier = fitted?;

    let artifacts = ModelArtifacts::new(vectorizer, classifier)?;

    // Evaluate through the same service the API uses.
    let service = InferenceService::new(artifacts.clone());
    let truth: Vec<Label> = split.test.iter().map(|e| e.label).collect();
    let predicted: Vec<Label> = split
        .test
        .iter()
        .map(|e| service.predict(&e.text).label)
        .collect();
    let report = evaluation::evaluate(&truth, &predicted)?;

    info!(
        accuracy = report.accuracy,
        toxic_f1 = report.metrics_for(Label::Toxic).f1,
        "Evaluated on held-out split"
    );

    Ok(TrainingOutcome {
        artifacts,
        report,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    })
}
