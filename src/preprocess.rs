// Text normalization shared by training and serving.
//
// Both pipelines must normalize identically or the vocabulary silently stops
// matching at serving time. The version number is stamped into every
// persisted artifact and checked when the artifacts are loaded.

/// Identifies the normalization implemented by [`preprocess`].
///
/// Bump this whenever `preprocess` changes behavior. Artifacts trained under
/// a different version are rejected at load time.
pub const PREPROCESS_VERSION: u32 = 1;

/// Lowercase the text and strip leading/trailing whitespace.
///
/// Nothing else: punctuation and tokenization are left to the vectorizer.
pub fn preprocess(text: &str) -> String {
    text.to_lowercase().trim().to_string()
}
