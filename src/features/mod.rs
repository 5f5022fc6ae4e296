// Feature extraction — raw text to sparse TF-IDF rows.
//
// The vectorizer is fitted once during training and then used read-only by
// the inference service.

pub mod sparse;
pub mod tfidf;

pub use sparse::SparseVector;
pub use tfidf::{TfidfVectorizer, VectorizerParams};
