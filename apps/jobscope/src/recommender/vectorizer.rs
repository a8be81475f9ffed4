//! TF-IDF vectorizer with smoothed IDF and L2-normalised rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::recommender::sparse::{CsrMatrix, SparseVector};
use crate::recommender::tokenize::tokenize;

pub const DEFAULT_MAX_FEATURES: usize = 50_000;

/// Fitted state. `terms` is sorted, so a term's column is its position and
/// lookup is a binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub max_features: usize,
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fits on `docs` and returns the vectorizer with the corpus matrix.
    ///
    /// When the corpus has more than `max_features` distinct terms, the ones
    /// with highest document frequency are kept (ties by term).
    pub fn fit_transform(
        docs: &[String],
        max_features: usize,
    ) -> Result<(Self, CsrMatrix), PipelineError> {
        if docs.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }

        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();
        let mut df: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut unique: Vec<&str> = tokens.iter().map(String::as_str).collect();
            unique.sort_unstable();
            unique.dedup();
            for term in unique {
                *df.entry(term).or_default() += 1;
            }
        }
        if df.is_empty() {
            return Err(PipelineError::EmptyVocabulary);
        }

        let mut ranked: Vec<(&str, usize)> = df.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features.max(1));
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n = docs.len() as f64;
        let terms: Vec<String> = ranked.iter().map(|(t, _)| t.to_string()).collect();
        let idf: Vec<f64> = ranked
            .iter()
            .map(|(_, df)| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let vectorizer = TfidfVectorizer {
            max_features,
            terms,
            idf,
        };
        let mut matrix = CsrMatrix::new(vectorizer.vocabulary_size());
        for tokens in &tokenized {
            matrix.push_row(&vectorizer.weigh(tokens));
        }
        Ok((vectorizer, matrix))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    pub fn term(&self, column: usize) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    /// Vectorizes unseen text. Out-of-vocabulary tokens are dropped.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(col) = self.column(token) {
                *counts.entry(col).or_default() += 1.0;
            }
        }
        let mut row = SparseVector::from_pairs(
            counts
                .into_iter()
                .map(|(col, tf)| (col, tf * self.idf[col]))
                .collect(),
        );
        row.l2_normalize();
        row
    }

    /// Consistency check for a vectorizer read back from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.terms.len() != self.idf.len() {
            return Err("terms and idf lengths differ".to_string());
        }
        if self.terms.windows(2).any(|w| w[0] >= w[1]) {
            return Err("terms are not sorted and unique".to_string());
        }
        if self.idf.iter().any(|v| !v.is_finite() || *v < 1.0) {
            return Err("idf weights out of range".to_string());
        }
        Ok(())
    }
}
