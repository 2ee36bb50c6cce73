use linfa::prelude::*;
use linfa_bayes::{MultinomialNb, NaiveBayes};
use ndarray::{ArrayView2, s};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};

use super::{dense_row, dense_rows, targets};
use crate::dataset::Label;
use crate::error::{Error, Result};

/// Rows densified per incremental fit step.
const BATCH_ROWS: usize = 256;

/// `linfa-bayes` multinomial naive Bayes over TF-IDF weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesModel {
    model: MultinomialNb<f64, usize>,
    n_features: usize,
}

impl BayesModel {
    /// Fits with Laplace smoothing (`alpha = 1`).
    pub fn fit(x: &CsMat<f64>, y: &[Label]) -> Result<Self> {
        Self::fit_batched(x, y, 1.0, BATCH_ROWS)
    }

    /// Feeds `x` to the estimator `batch_rows` rows at a time, so only one
    /// dense batch is alive at once.
    pub fn fit_batched(x: &CsMat<f64>, y: &[Label], alpha: f64, batch_rows: usize) -> Result<Self> {
        let params = MultinomialNb::params().alpha(alpha);
        let labels = targets(y);
        let batch_rows = batch_rows.max(1);

        let mut model: Option<MultinomialNb<f64, usize>> = None;
        let mut start = 0;
        while start < x.rows() {
            let end = (start + batch_rows).min(x.rows());
            let batch = Dataset::new(dense_rows(x, start..end), labels.slice(s![start..end]).to_owned());
            model = params
                .fit_with(model, &batch)
                .map(Option::from)
                .map_err(|e| Error::Training(format!("MultinomialNB: {e}")))?;
            start = end;
        }

        let model = model.ok_or_else(|| Error::Training("MultinomialNB: no training rows".to_string()))?;
        Ok(Self {
            model,
            n_features: x.cols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// `[P(ham), P(spam)]` for every row of `x`.
    fn proba_rows(&self, x: ArrayView2<'_, f64>) -> Vec<[f64; 2]> {
        let (proba, classes) = self.model.predict_proba(x);
        let column = |label: Label| classes.iter().position(|&&c| c == label.index());
        let (ham, spam) = (column(Label::Ham), column(Label::Spam));

        proba
            .outer_iter()
            .map(|p| {
                let at = |col: Option<usize>| col.map_or(0.0, |i| p[i]);
                [at(ham), at(spam)]
            })
            .collect()
    }

    /// `[P(ham), P(spam)]`
    pub fn predict_proba(&self, x: &CsVecView<'_, f64>) -> [f64; 2] {
        self.proba_rows(dense_row(x).view())[0]
    }

    pub fn predict(&self, x: &CsVecView<'_, f64>) -> Label {
        to_label(self.predict_proba(x))
    }

    pub fn predict_all(&self, x: &CsMat<f64>) -> Vec<Label> {
        let mut labels = Vec::with_capacity(x.rows());
        let mut start = 0;
        while start < x.rows() {
            let end = (start + BATCH_ROWS).min(x.rows());
            let batch = dense_rows(x, start..end);
            labels.extend(self.proba_rows(batch.view()).into_iter().map(to_label));
            start = end;
        }
        labels
    }
}

fn to_label(p: [f64; 2]) -> Label {
    if p[1] > p[0] { Label::Spam } else { Label::Ham }
}
