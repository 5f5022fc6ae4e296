// Held-out evaluation: confusion matrix and per-class precision/recall/F1.
//
// Ratios with a zero denominator report as 0.0. The report is for a human
// to read; nothing here gates whether the model gets saved.

use anyhow::Result;
use serde::Serialize;

use crate::inference::Label;

/// Precision, recall, F1 and support for one class (or an average).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation of a binary classifier on a test set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// `confusion[true][predicted]`, classes in `Label::ALL` order.
    pub confusion: [[usize; 2]; 2],
    /// Metrics per class, in `Label::ALL` order.
    pub per_class: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl EvaluationReport {
    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    pub fn metrics_for(&self, label: Label) -> &ClassMetrics {
        &self.per_class[label.class_index()]
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Compare true labels against predictions.
pub fn evaluate(truth: &[Label], predicted: &[Label]) -> Result<EvaluationReport> {
    if truth.len() != predicted.len() {
        anyhow::bail!(
            "Got {} true labels but {} predictions",
            truth.len(),
            predicted.len()
        );
    }
    if truth.is_empty() {
        anyhow::bail!("Cannot evaluate on an empty test set");
    }

    let mut confusion = [[0usize; 2]; 2];
    for (t, p) in truth.iter().zip(predicted) {
        confusion[t.class_index()][p.class_index()] += 1;
    }

    let per_class = Label::ALL.map(|label| {
        let k = label.class_index();
        let true_positive = confusion[k][k];
        let predicted_k: usize = (0..2).map(|t| confusion[t][k]).sum();
        let support: usize = confusion[k].iter().sum();
        let precision = ratio(true_positive, predicted_k);
        let recall = ratio(true_positive, support);
        ClassMetrics {
            precision,
            recall,
            f1: f1(precision, recall),
            support,
        }
    });

    let total = truth.len();
    let correct = confusion[0][0] + confusion[1][1];

    let n_classes = per_class.len() as f64;
    let macro_avg = ClassMetrics {
        precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n_classes,
        recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n_classes,
        f1: per_class.iter().map(|m| m.f1).sum::<f64>() / n_classes,
        support: total,
    };
    let weighted = |get: fn(&ClassMetrics) -> f64| {
        per_class
            .iter()
            .map(|m| get(m) * m.support as f64)
            .sum::<f64>()
            / total as f64
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total,
    };

    Ok(EvaluationReport {
        confusion,
        per_class,
        accuracy: ratio(correct, total),
        macro_avg,
        weighted_avg,
    })
}
