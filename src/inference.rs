// Inference service — one text in, one prediction out.
//
// The service owns the fitted vectorizer and classifier. It is built once at
// startup, wrapped in an Arc, and shared read-only by every request; nothing
// on the request path mutates it, so no locking is needed.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::TfidfVectorizer;
use crate::preprocess::preprocess;
use crate::toxicity::artifacts::ModelArtifacts;
use crate::toxicity::classifier::LogisticRegression;

/// Probability at or above which a text is labeled toxic.
pub const TOXIC_THRESHOLD: f64 = 0.5;

/// The two classes. `Toxic` is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NonToxic,
    Toxic,
}

impl Label {
    /// Both classes in report order (negative class first).
    pub const ALL: [Label; 2] = [Label::NonToxic, Label::Toxic];

    /// Threshold a positive-class probability.
    pub fn from_probability(probability: f64) -> Self {
        if probability >= TOXIC_THRESHOLD {
            Self::Toxic
        } else {
            Self::NonToxic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonToxic => "non_toxic",
            Self::Toxic => "toxic",
        }
    }

    pub fn is_toxic(&self) -> bool {
        matches!(self, Self::Toxic)
    }

    /// Numeric class: 1 for toxic, 0 for non-toxic.
    pub fn class_index(&self) -> usize {
        match self {
            Self::NonToxic => 0,
            Self::Toxic => 1,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = anyhow::Error;

    /// Exact match on the wire strings; no trimming or case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toxic" => Ok(Self::Toxic),
            "non_toxic" => Ok(Self::NonToxic),
            other => anyhow::bail!("unknown label {other:?} (expected \"toxic\" or \"non_toxic\")"),
        }
    }
}

/// Round to 3 decimal places.
///
/// Rounds the exact binary value (ties to even) through decimal formatting:
/// 0.1235 is stored as 0.12349999... and becomes 0.123.
pub fn round_confidence(probability: f64) -> f64 {
    format!("{probability:.3}").parse().unwrap_or(probability)
}

/// The result of classifying a single text.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// The text after preprocessing.
    pub text: String,
    /// Raw positive-class probability.
    pub probability: f64,
    pub label: Label,
    /// `probability` rounded to 3 decimal places.
    pub confidence: f64,
}

/// Read-only serving context: preprocess, vectorize, classify, threshold.
pub struct InferenceService {
    vectorizer: TfidfVectorizer,
    classifier: LogisticRegression,
}

impl InferenceService {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            vectorizer: artifacts.vectorizer,
            classifier: artifacts.classifier,
        }
    }

    /// Load the artifacts from `model_dir`. Any failure is fatal for serving.
    pub fn load(model_dir: &Path) -> Result<Self> {
        Ok(Self::new(ModelArtifacts::load(model_dir)?))
    }

    /// Positive-class probability for already-preprocessed text.
    pub fn probability(&self, normalized: &str) -> f64 {
        let features = self.vectorizer.transform(normalized);
        self.classifier.predict_proba(&features)
    }

    /// Classify raw request text. Pure: the same text always yields the same
    /// prediction.
    pub fn predict(&self, raw: &str) -> Prediction {
        let text = preprocess(raw);
        let probability = self.probability(&text);
        let label = Label::from_probability(probability);

        debug!(
            label = label.as_str(),
            probability,
            chars = text.chars().count(),
            "Classified text"
        );

        Prediction {
            confidence: round_confidence(probability),
            label,
            probability,
            text,
        }
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}
