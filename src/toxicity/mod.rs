// Toxicity model — the fitted classifier and its on-disk artifacts.
//
// LogisticRegression maps a TF-IDF row to P(toxic). ModelArtifacts pairs it
// with the vectorizer it was trained against and handles persistence.

pub mod artifacts;
pub mod classifier;
