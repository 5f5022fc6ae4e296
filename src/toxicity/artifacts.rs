// Persisted model artifacts — the fitted vectorizer and classifier.
//
// Both are plain JSON files in one model directory (./model by default).
// Training writes them; the inference service reads them exactly once at
// startup. Every check here is a startup check: a service with a missing,
// corrupt, or mismatched artifact must not start.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::classifier::LogisticRegression;
use crate::features::TfidfVectorizer;
use crate::preprocess::PREPROCESS_VERSION;

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const MODEL_FILE: &str = "toxicity_model.json";

/// Default model directory, relative to the working directory.
pub fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}

/// Check whether both artifact files exist in `dir`.
pub fn artifact_files_present(dir: &Path) -> bool {
    dir.join(VECTORIZER_FILE).exists() && dir.join(MODEL_FILE).exists()
}

/// The fitted vectorizer and classifier, loaded or saved as a pair.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LogisticRegression,
}

impl ModelArtifacts {
    /// Pair a vectorizer with a classifier, checking they agree.
    pub fn new(vectorizer: TfidfVectorizer, classifier: LogisticRegression) -> Result<Self> {
        let artifacts = Self {
            vectorizer,
            classifier,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    /// Load both artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        if !artifact_files_present(dir) {
            anyhow::bail!(
                "Model artifacts not found in {} (expected {} and {}).\n\
                 Run `kreol-toxicity train` to create them.",
                dir.display(),
                VECTORIZER_FILE,
                MODEL_FILE
            );
        }

        let vectorizer: TfidfVectorizer = read_json(&dir.join(VECTORIZER_FILE))?;
        let classifier: LogisticRegression = read_json(&dir.join(MODEL_FILE))?;
        let artifacts = Self::new(vectorizer, classifier)
            .with_context(|| format!("Model artifacts in {} are inconsistent", dir.display()))?;

        info!(
            dir = %dir.display(),
            features = artifacts.vectorizer.n_features(),
            trained_at = %artifacts.classifier.trained_at,
            "Loaded model artifacts"
        );

        Ok(artifacts)
    }

    /// Write both artifacts into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

        write_json(&dir.join(VECTORIZER_FILE), &self.vectorizer)?;
        write_json(&dir.join(MODEL_FILE), &self.classifier)?;

        info!(dir = %dir.display(), "Saved model artifacts");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, version) in [
            ("vectorizer", self.vectorizer.preprocess_version),
            ("classifier", self.classifier.preprocess_version),
        ] {
            if version != PREPROCESS_VERSION {
                anyhow::bail!(
                    "The {name} was trained with preprocessing v{version}, but this build \
                     uses v{PREPROCESS_VERSION}. Retrain with `kreol-toxicity train`."
                );
            }
        }

        self.vectorizer.validate()?;
        self.classifier.validate()?;

        if self.vectorizer.n_features() != self.classifier.n_features {
            anyhow::bail!(
                "Vectorizer produces {} features but the classifier expects {}",
                self.vectorizer.n_features(),
                self.classifier.n_features
            );
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}
