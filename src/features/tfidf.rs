// TF-IDF vectorizer over word unigrams and bigrams.
//
// The vocabulary and IDF weights are frozen by `fit` on the training split
// and serialized next to the classifier. Serving only ever calls
// `transform`, which never changes vectorizer state.
//
// Conventions: tokens are runs of two or more word characters, IDF is
// smoothed (`ln((1 + n) / (1 + df)) + 1`), rows are L2-normalized, and
// vocabulary indices follow lexicographic n-gram order.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::sparse::SparseVector;
use crate::preprocess::PREPROCESS_VERSION;

/// Fit-time settings for the vectorizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Inclusive `(min_n, max_n)` n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Drop terms appearing in fewer than this many documents.
    pub min_df: usize,
    /// Drop terms appearing in more than this fraction of documents.
    pub max_df: f64,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            ngram_range: (1, 2),
            min_df: 2,
            max_df: 0.9,
        }
    }
}

/// A fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Version of `preprocess` the vocabulary was built under.
    pub preprocess_version: u32,
    pub params: VectorizerParams,
    /// n-gram -> feature index. BTreeMap keeps the artifact diff-friendly.
    vocabulary: BTreeMap<String, usize>,
    /// IDF weight per feature index.
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and document frequencies from `docs`.
    ///
    /// `docs` are expected to be preprocessed already.
    pub fn fit(docs: &[String], params: VectorizerParams) -> Result<Self> {
        let (min_n, max_n) = params.ngram_range;
        if min_n == 0 || min_n > max_n {
            anyhow::bail!("Invalid n-gram range ({min_n}, {max_n})");
        }
        if !(params.max_df > 0.0 && params.max_df <= 1.0) {
            anyhow::bail!("max_df must be in (0, 1], got {}", params.max_df);
        }
        if docs.is_empty() {
            anyhow::bail!("Cannot fit a vectorizer on zero documents");
        }

        let n_docs = docs.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let tokens = tokenize(doc);
            let unique: HashSet<String> = ngrams(&tokens, params.ngram_range).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_doc_count = params.max_df * n_docs as f64;
        if max_doc_count < params.min_df as f64 {
            anyhow::bail!(
                "max_df={} keeps terms in at most {max_doc_count:.1} of {n_docs} documents, \
                 fewer than min_df={}",
                params.max_df,
                params.min_df
            );
        }

        let total_terms = doc_freq.len();
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= params.min_df && (*df as f64) <= max_doc_count)
            .collect();

        if kept.is_empty() {
            anyhow::bail!(
                "After pruning, no terms remain ({total_terms} candidate n-grams in {n_docs} \
                 documents). Try more training data or a lower min_df."
            );
        }

        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (index, (term, df)) in kept.into_iter().enumerate() {
            idf.push(smoothed_idf(n_docs, df));
            vocabulary.insert(term, index);
        }

        info!(
            documents = n_docs,
            candidates = total_terms,
            vocabulary = vocabulary.len(),
            "Fitted TF-IDF vocabulary"
        );

        Ok(Self {
            preprocess_version: PREPROCESS_VERSION,
            params,
            vocabulary,
            idf,
        })
    }

    /// Map a preprocessed text to its L2-normalized TF-IDF row.
    ///
    /// n-grams outside the vocabulary are dropped; text with no known n-gram
    /// maps to the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        let pairs: Vec<(usize, f64)> = ngrams(&tokens, self.params.ngram_range)
            .iter()
            .filter_map(|term| self.vocabulary.get(term.as_str()))
            .map(|&index| (index, self.idf[index]))
            .collect();

        // Repeated terms merge by summation, giving count * idf.
        let mut row = SparseVector::from_pairs(pairs);
        row.l2_normalize();
        row
    }

    /// Number of feature dimensions.
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Terms in index order.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(t, &i)| (t.as_str(), i))
            .collect();
        terms.sort_by_key(|(_, i)| *i);
        terms.into_iter().map(|(t, _)| t).collect()
    }

    /// Check internal consistency of a deserialized vectorizer.
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.len() != self.idf.len() {
            anyhow::bail!(
                "Vectorizer has {} vocabulary terms but {} IDF weights",
                self.vocabulary.len(),
                self.idf.len()
            );
        }
        let mut seen = vec![false; self.idf.len()];
        for (term, &index) in &self.vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => anyhow::bail!("Vocabulary index {index} is used twice"),
                None => anyhow::bail!(
                    "Vocabulary term {term:?} has index {index}, outside {} features",
                    self.idf.len()
                ),
            }
        }
        if let Some(bad) = self.idf.iter().find(|w| !w.is_finite()) {
            anyhow::bail!("Vectorizer contains a non-finite IDF weight ({bad})");
        }
        Ok(())
    }
}

fn smoothed_idf(n_docs: usize, df: usize) -> f64 {
    ((1 + n_docs) as f64 / (1 + df) as f64).ln() + 1.0
}

/// Split text into tokens of two or more word characters
/// (letters, digits, underscore).
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut len = 0usize;

    for (pos, c) in text.char_indices() {
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(pos);
                len = 0;
            }
            len += 1;
        } else if let Some(s) = start.take() {
            if len >= 2 {
                tokens.push(&text[s..pos]);
            }
        }
    }
    if let Some(s) = start {
        if len >= 2 {
            tokens.push(&text[s..]);
        }
    }

    tokens
}

/// All n-grams of the token stream for each length in `range`, shortest
/// first. Multi-token n-grams are joined with a single space.
pub fn ngrams(tokens: &[&str], range: (usize, usize)) -> Vec<String> {
    let (min_n, max_n) = range;
    let mut out = Vec::new();
    for n in min_n..=max_n {
        if n == 0 || n > tokens.len() {
            continue;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}
