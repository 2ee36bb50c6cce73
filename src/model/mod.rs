//! Candidate classifiers over sparse TF-IDF rows.
//!
//! Each algorithm is a variant of [`Model`]. The variant fixes how a
//! confidence score is derived ([`ScoreStrategy`]), so callers decide once,
//! when a model is selected or loaded, instead of probing on every request.
//!
//! Naive Bayes and logistic regression are fitted with `linfa`, which takes
//! dense records; rows are densified in batches where the estimator allows it.

mod linear_svm;
mod logistic;
mod naive_bayes;

pub use linear_svm::LinearSvc;
pub use logistic::LogisticModel;
pub use naive_bayes::BayesModel;

use std::ops::Range;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};

use crate::dataset::Label;
use crate::error::{Error, Result};

/// How a prediction's confidence is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreStrategy {
    /// Maximum class probability, in `[0, 1]`.
    Probability,
    /// Decision margin squashed through the logistic function into `(0, 1)`.
    /// This is a monotone confidence, not a calibrated probability.
    Margin,
    /// No score is reported.
    None,
}

/// The candidate algorithms, in selection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    NaiveBayes,
    Logistic,
    LinearSvm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::NaiveBayes, ModelKind::Logistic, ModelKind::LinearSvm];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::NaiveBayes => "MultinomialNB",
            ModelKind::Logistic => "LogisticRegression",
            ModelKind::LinearSvm => "LinearSVC",
        }
    }

    pub fn score_strategy(&self) -> ScoreStrategy {
        match self {
            ModelKind::NaiveBayes | ModelKind::Logistic => ScoreStrategy::Probability,
            ModelKind::LinearSvm => ScoreStrategy::Margin,
        }
    }

    /// Fits this algorithm with its default hyperparameters. The feature
    /// count is taken from the columns of `x`.
    pub fn fit(&self, x: &CsMat<f64>, y: &[Label], seed: u64) -> Result<Model> {
        check_training_set(x, y)?;
        let model = match self {
            ModelKind::NaiveBayes => Model::NaiveBayes(BayesModel::fit(x, y)?),
            ModelKind::Logistic => Model::Logistic(LogisticModel::fit(x, y)?),
            ModelKind::LinearSvm => Model::LinearSvm(LinearSvc::params().seed(seed).fit(x, y)),
        };
        Ok(model)
    }
}

/// A fitted candidate classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    NaiveBayes(BayesModel),
    Logistic(LogisticModel),
    LinearSvm(LinearSvc),
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::NaiveBayes(_) => ModelKind::NaiveBayes,
            Model::Logistic(_) => ModelKind::Logistic,
            Model::LinearSvm(_) => ModelKind::LinearSvm,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn score_strategy(&self) -> ScoreStrategy {
        self.kind().score_strategy()
    }

    /// Width of the rows the model was fitted on. Rows passed to the
    /// prediction methods must have this dimension.
    pub fn n_features(&self) -> usize {
        match self {
            Model::NaiveBayes(m) => m.n_features(),
            Model::Logistic(m) => m.n_features(),
            Model::LinearSvm(m) => m.n_features(),
        }
    }

    pub fn predict(&self, x: &CsVecView<'_, f64>) -> Label {
        match self {
            Model::NaiveBayes(m) => m.predict(x),
            Model::Logistic(m) => m.predict(x),
            Model::LinearSvm(m) => m.predict(x),
        }
    }

    pub fn predict_all(&self, xs: &CsMat<f64>) -> Vec<Label> {
        match self {
            Model::NaiveBayes(m) => m.predict_all(xs),
            _ => xs.outer_iterator().map(|x| self.predict(&x)).collect(),
        }
    }

    /// Class probabilities indexed as `[ham, spam]`, when the model has them.
    pub fn predict_proba(&self, x: &CsVecView<'_, f64>) -> Option<[f64; 2]> {
        match self {
            Model::NaiveBayes(m) => Some(m.predict_proba(x)),
            Model::Logistic(m) => Some(m.predict_proba(x)),
            Model::LinearSvm(_) => None,
        }
    }

    /// Signed distance from the separating hyperplane, positive towards spam.
    pub fn decision_function(&self, x: &CsVecView<'_, f64>) -> Option<f64> {
        match self {
            Model::NaiveBayes(_) => None,
            Model::Logistic(m) => Some(m.decision_function(x)),
            Model::LinearSvm(m) => Some(m.decision_function(x)),
        }
    }

    /// Confidence for `x` under the given strategy.
    pub fn score(&self, strategy: ScoreStrategy, x: &CsVecView<'_, f64>) -> Option<f64> {
        match strategy {
            ScoreStrategy::Probability => self
                .predict_proba(x)
                .map(|p| p.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            ScoreStrategy::Margin => self.decision_function(x).map(sigmoid),
            ScoreStrategy::None => None,
        }
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `+1` for spam, `-1` for ham.
pub(crate) fn sign(label: Label) -> f64 {
    if label.is_spam() { 1.0 } else { -1.0 }
}

/// `sum(x[j] * w[j])` over the stored entries of `x`.
pub(crate) fn sparse_dot(x: &CsVecView<'_, f64>, w: &Array1<f64>) -> f64 {
    x.iter().map(|(j, &v)| v * w[j]).sum()
}

/// Dense copy of `rows` of a CSR matrix.
pub(crate) fn dense_rows(x: &CsMat<f64>, rows: Range<usize>) -> Array2<f64> {
    let mut dense = Array2::zeros((rows.len(), x.cols()));
    for (r, i) in rows.enumerate() {
        if let Some(row) = x.outer_view(i) {
            for (j, &v) in row.iter() {
                dense[[r, j]] = v;
            }
        }
    }
    dense
}

/// A single sparse row as a `1 x dim` dense matrix.
pub(crate) fn dense_row(x: &CsVecView<'_, f64>) -> Array2<f64> {
    let mut dense = Array2::zeros((1, x.dim()));
    for (j, &v) in x.iter() {
        dense[[0, j]] = v;
    }
    dense
}

/// `0` for ham, `1` for spam, as used for `linfa` targets.
pub(crate) fn targets(y: &[Label]) -> Array1<usize> {
    y.iter().map(|label| label.index()).collect()
}

fn check_training_set(x: &CsMat<f64>, y: &[Label]) -> Result<()> {
    if !x.is_csr() {
        return Err(Error::Training("feature matrix must be in CSR layout".to_string()));
    }
    if x.rows() != y.len() {
        return Err(Error::Training(format!(
            "{} feature rows but {} labels",
            x.rows(),
            y.len()
        )));
    }
    for label in Label::ALL {
        if !y.contains(&label) {
            return Err(Error::Training(format!(
                "training split has no {label} rows; both classes are required"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tfidf::stack_rows;
    use sprs::CsVec;

    pub(crate) fn row(indices: Vec<usize>, values: Vec<f64>) -> CsVec<f64> {
        CsVec::new(5, indices, values)
    }

    /// Two clearly separable clusters: feature 0/1 mark spam, 2/3 mark ham.
    pub(crate) fn toy_data() -> (CsMat<f64>, Vec<Label>) {
        let rows = vec![
            row(vec![0, 1], vec![0.8, 0.6]),
            row(vec![0], vec![1.0]),
            row(vec![1, 4], vec![0.9, 0.436]),
            row(vec![0, 1, 4], vec![0.6, 0.6, 0.529]),
            row(vec![2, 3], vec![0.6, 0.8]),
            row(vec![3], vec![1.0]),
            row(vec![2, 4], vec![0.9, 0.436]),
            row(vec![2, 3, 4], vec![0.6, 0.6, 0.529]),
        ];
        let y = vec![
            Label::Spam,
            Label::Spam,
            Label::Spam,
            Label::Spam,
            Label::Ham,
            Label::Ham,
            Label::Ham,
            Label::Ham,
        ];
        (stack_rows(&rows, 5), y)
    }

    #[test]
    fn test_every_kind_separates_toy_data() {
        let (x, y) = toy_data();
        for kind in ModelKind::ALL {
            let model = kind.fit(&x, &y, 42).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.n_features(), 5);
            assert_eq!(model.predict_all(&x), y, "{} misclassified", kind.name());
        }
    }

    #[test]
    fn test_score_strategies() {
        let (x, y) = toy_data();
        let spammy = row(vec![0, 1], vec![0.7, 0.7]);
        for kind in ModelKind::ALL {
            let model = kind.fit(&x, &y, 42).unwrap();
            let score = model.score(model.score_strategy(), &spammy.view()).unwrap();
            match model.score_strategy() {
                ScoreStrategy::Probability => assert!((0.5..=1.0).contains(&score)),
                ScoreStrategy::Margin => assert!(score > 0.5 && score < 1.0),
                ScoreStrategy::None => unreachable!(),
            }
            assert_eq!(model.score(ScoreStrategy::None, &spammy.view()), None);
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let (x, _) = toy_data();
        let y = vec![Label::Ham; x.rows()];
        for kind in ModelKind::ALL {
            assert!(matches!(kind.fit(&x, &y, 42), Err(Error::Training(_))));
        }
    }

    #[test]
    fn test_label_count_must_match_rows() {
        let (x, mut y) = toy_data();
        y.pop();
        assert!(matches!(ModelKind::NaiveBayes.fit(&x, &y, 42), Err(Error::Training(_))));
    }

    #[test]
    fn test_dense_helpers_match_sparse_rows() {
        let (x, _) = toy_data();
        let dense = dense_rows(&x, 2..4);
        assert_eq!(dense.dim(), (2, 5));
        assert_eq!(dense[[0, 1]], 0.9);
        assert_eq!(dense[[0, 4]], 0.436);
        assert_eq!(dense[[1, 0]], 0.6);
        assert_eq!(dense[[1, 2]], 0.0);

        let first = x.outer_view(0).unwrap();
        let single = dense_row(&first);
        assert_eq!(single.row(0).to_vec(), vec![0.8, 0.6, 0.0, 0.0, 0.0]);
        assert_eq!(sparse_dot(&first, &Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0])), 2.0);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(5.0) > 0.99 && sigmoid(5.0) < 1.0);
    }
}
