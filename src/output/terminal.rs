// Colored terminal output for evaluation reports and one-off predictions.

use colored::Colorize;

use crate::inference::{Label, Prediction};
use crate::training::evaluation::{ClassMetrics, EvaluationReport};

/// Display the confusion matrix and classification report.
pub fn display_evaluation(report: &EvaluationReport) {
    println!("\n{}", "=== Confusion Matrix ===".bold());
    println!(
        "  {:<12} {:>10} {:>10}",
        "true \\ pred".dimmed(),
        Label::NonToxic.as_str().dimmed(),
        Label::Toxic.as_str().dimmed(),
    );
    for label in Label::ALL {
        let row = report.confusion[label.class_index()];
        println!("  {:<12} {:>10} {:>10}", label.as_str(), row[0], row[1]);
    }

    println!("\n{}", "=== Classification Report ===".bold());
    println!(
        "  {:<14} {:>9} {:>9} {:>9} {:>9}",
        "",
        "precision".dimmed(),
        "recall".dimmed(),
        "f1-score".dimmed(),
        "support".dimmed(),
    );
    for label in Label::ALL {
        print_metrics_row(label.as_str(), report.metrics_for(label));
    }
    println!();
    println!(
        "  {:<14} {:>9} {:>9} {:>9.2} {:>9}",
        "accuracy",
        "",
        "",
        report.accuracy,
        report.total()
    );
    print_metrics_row("macro avg", &report.macro_avg);
    print_metrics_row("weighted avg", &report.weighted_avg);

    let accuracy = format!("{:.1}%", report.accuracy * 100.0);
    let colored_accuracy = if report.accuracy >= 0.8 {
        accuracy.green()
    } else if report.accuracy >= 0.6 {
        accuracy.yellow()
    } else {
        accuracy.red()
    };
    println!("\n  Held-out accuracy: {}", colored_accuracy.bold());
}

fn print_metrics_row(name: &str, m: &ClassMetrics) {
    println!(
        "  {:<14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1, m.support
    );
}

/// Display a single prediction.
pub fn display_prediction(prediction: &Prediction) {
    let preview = super::truncate_chars(&prediction.text, 80);
    println!("  Text:       {}", preview.dimmed());
    println!("  Label:      {}", colorize_label(prediction.label));
    println!("  Confidence: {:.3}", prediction.confidence);
}

/// Colorize a label.
fn colorize_label(label: Label) -> colored::ColoredString {
    match label {
        Label::Toxic => label.as_str().red().bold(),
        Label::NonToxic => label.as_str().green(),
    }
}
