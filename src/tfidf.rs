//! TF-IDF feature extraction over word unigrams and bigrams.

use std::collections::{BTreeMap, HashMap};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec};
use tracing::debug;

use crate::error::{Error, Result};

pub const MAX_FEATURES: usize = 20_000;

/// Corpora at or below this size keep terms seen in a single document.
pub const SMALL_CORPUS_ROWS: usize = 50;

/// Stacks sparse rows of equal dimension into a CSR matrix.
pub fn stack_rows(rows: &[CsVec<f64>], n_features: usize) -> CsMat<f64> {
    let nnz = rows.iter().map(|r| r.nnz()).sum();
    let mut indptr = Vec::with_capacity(rows.len() + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);
    indptr.push(0);
    for row in rows {
        for (j, &v) in row.iter() {
            indices.push(j);
            data.push(v);
        }
        indptr.push(indices.len());
    }
    CsMat::new((rows.len(), n_features), indptr, indices, data)
}

/// Lowercases and splits on anything that is not a word character, keeping
/// tokens of two or more characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|s| s.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Unigrams followed by space-joined bigrams.
pub fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut grams = Vec::with_capacity(tokens.len() * 2);
    for pair in tokens.windows(2) {
        grams.push(format!("{} {}", pair[0], pair[1]));
    }
    let mut out = tokens;
    out.append(&mut grams);
    out
}

/// Fitted vectorizer. The vocabulary and idf weights are frozen after `fit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocab: BTreeMap<String, usize>,
    idf: Array1<f64>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary and idf weights from training texts.
    pub fn fit<S: AsRef<str>>(docs: &[S]) -> Result<Self> {
        let min_df = if docs.len() > SMALL_CORPUS_ROWS { 2 } else { 1 };
        Self::fit_with(docs, min_df, MAX_FEATURES)
    }

    pub fn fit_with<S: AsRef<str>>(docs: &[S], min_df: usize, max_features: usize) -> Result<Self> {
        if docs.is_empty() {
            return Err(Error::EmptyVocabulary);
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let mut seen: HashMap<String, usize> = HashMap::new();
            for gram in ngrams(doc.as_ref()) {
                *seen.entry(gram).or_insert(0) += 1;
            }
            for (gram, count) in seen {
                *term_freq.entry(gram.clone()).or_insert(0) += count;
                *doc_freq.entry(gram).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = term_freq
            .into_iter()
            .filter(|(gram, _)| doc_freq[gram] >= min_df)
            .collect();
        if kept.len() > max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(max_features);
        }
        if kept.is_empty() {
            return Err(Error::EmptyVocabulary);
        }

        let terms: BTreeMap<String, usize> = kept
            .into_iter()
            .map(|(gram, _)| {
                let df = doc_freq[&gram];
                (gram, df)
            })
            .collect();

        let n = docs.len() as f64;
        let mut vocab = BTreeMap::new();
        let mut idf = Array1::zeros(terms.len());
        for (idx, (gram, df)) in terms.into_iter().enumerate() {
            idf[idx] = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
            vocab.insert(gram, idx);
        }

        debug!("Fitted vocabulary of {} terms (min_df={})", vocab.len(), min_df);
        Ok(Self { vocab, idf })
    }

    /// Maps text onto the frozen vocabulary. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> CsVec<f64> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in ngrams(text) {
            if let Some(&idx) = self.vocab.get(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let indices: Vec<usize> = counts.keys().copied().collect();
        let mut values: Vec<f64> = counts
            .into_iter()
            .map(|(idx, tf)| tf * self.idf[idx])
            .collect();

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        CsVec::new(self.n_features(), indices, values)
    }

    /// One CSR row per document.
    pub fn transform_all<S: AsRef<str>>(&self, docs: &[S]) -> CsMat<f64> {
        let rows: Vec<CsVec<f64>> = docs.iter().map(|d| self.transform(d.as_ref())).collect();
        stack_rows(&rows, self.n_features())
    }

    pub fn n_features(&self) -> usize {
        self.vocab.len()
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocab
    }
}
