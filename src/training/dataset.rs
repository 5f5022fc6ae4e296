// Labeled training data loaded from CSV.
//
// The CSV needs a `text` and a `label` column; other columns are ignored.
// Labels must be exactly "toxic" or "non_toxic". Any bad row fails the whole
// load, before anything gets fitted.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::inference::Label;

/// One row of training data.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub text: String,
    pub label: Label,
}

#[derive(Deserialize)]
struct CsvRow {
    text: String,
    label: String,
}

const REQUIRED_COLUMNS: [&str; 2] = ["text", "label"];

/// Load labeled examples from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<LabeledExample>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open training data at {}", path.display()))?;
    let examples = read_examples(file)
        .with_context(|| format!("Invalid training data in {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = examples.len(),
        toxic = examples.iter().filter(|e| e.label.is_toxic()).count(),
        "Loaded training data"
    );
    Ok(examples)
}

/// Parse labeled examples from any CSV source.
pub fn read_examples<R: Read>(source: R) -> Result<Vec<LabeledExample>> {
    let mut reader = csv::Reader::from_reader(source);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "CSV is missing required column(s): {} (found: {})",
            missing.join(", "),
            headers.iter().collect::<Vec<_>>().join(", ")
        );
    }

    let mut examples = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let row = row.with_context(|| format!("Malformed CSV row at line {line}"))?;
        let label: Label = row
            .label
            .parse()
            .with_context(|| format!("Bad label at line {line}"))?;
        examples.push(LabeledExample {
            text: row.text,
            label,
        });
    }

    if examples.is_empty() {
        anyhow::bail!("CSV contains no data rows");
    }

    Ok(examples)
}
