use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::debug;

use super::{dense_rows, sigmoid, sparse_dot, targets};
use crate::dataset::Label;
use crate::error::{Error, Result};

/// Hyperparameters for [`LogisticModel`].
#[derive(Debug, Clone)]
pub struct LogisticParams {
    c: f64,
    max_iterations: u64,
    gradient_tolerance: f64,
}

impl LogisticParams {
    /// Inverse regularisation strength.
    pub fn c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn gradient_tolerance(mut self, tol: f64) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Minimises `sum(log(1 + exp(-y * (w.x + b)))) + 0.5 / C * |w|^2` with
    /// `linfa-logistic`. The intercept is not penalised.
    pub fn fit(&self, x: &CsMat<f64>, y: &[Label]) -> Result<LogisticModel> {
        let dataset = Dataset::new(dense_rows(x, 0..x.rows()), targets(y));
        let fitted = LogisticRegression::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iterations)
            .gradient_tolerance(self.gradient_tolerance)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| Error::Training(format!("LogisticRegression: {e}")))?;

        // linfa picks its own positive class; store weights pointing at spam.
        let orientation = if fitted.labels().pos.class == Label::Spam.index() {
            1.0
        } else {
            -1.0
        };
        let weights = fitted.params().mapv(|w| orientation * w);
        let intercept = orientation * fitted.intercept();
        debug!(
            "LogisticRegression fitted {} weights (intercept={:.4})",
            weights.len(),
            intercept
        );

        Ok(LogisticModel { weights, intercept })
    }
}

/// L2-regularised binary logistic regression; spam is the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Array1<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn params() -> LogisticParams {
        LogisticParams {
            c: 1.0,
            max_iterations: 2000,
            gradient_tolerance: 1e-4,
        }
    }

    /// Fits with `C = 1`.
    pub fn fit(x: &CsMat<f64>, y: &[Label]) -> Result<Self> {
        Self::params().fit(x, y)
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn decision_function(&self, x: &CsVecView<'_, f64>) -> f64 {
        sparse_dot(x, &self.weights) + self.intercept
    }

    /// `[P(ham), P(spam)]`
    pub fn predict_proba(&self, x: &CsVecView<'_, f64>) -> [f64; 2] {
        let p = sigmoid(self.decision_function(x));
        [1.0 - p, p]
    }

    pub fn predict(&self, x: &CsVecView<'_, f64>) -> Label {
        if self.decision_function(x) > 0.0 { Label::Spam } else { Label::Ham }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::toy_data;
    use crate::tfidf::stack_rows;
    use sprs::CsVec;

    #[test]
    fn test_probability_tracks_decision() {
        let (x, y) = toy_data();
        let model = LogisticModel::fit(&x, &y).unwrap();
        for (r, label) in x.outer_iterator().zip(&y) {
            let p = model.predict_proba(&r);
            assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
            assert_eq!(p[1] > 0.5, label.is_spam());
        }
    }

    #[test]
    fn test_spam_stays_positive_whatever_the_row_order() {
        let (x, y) = toy_data();
        let mut rows: Vec<CsVec<f64>> = x.outer_iterator().map(|r| r.to_owned()).collect();
        rows.reverse();
        let mut reversed = y.clone();
        reversed.reverse();

        let model = LogisticModel::fit(&stack_rows(&rows, 5), &reversed).unwrap();
        for (r, label) in x.outer_iterator().zip(&y) {
            assert_eq!(model.decision_function(&r) > 0.0, label.is_spam());
        }
    }

    #[test]
    fn test_stronger_regularisation_shrinks_weights() {
        let (x, y) = toy_data();
        let loose = LogisticModel::params().c(10.0).fit(&x, &y).unwrap();
        let tight = LogisticModel::params().c(0.1).fit(&x, &y).unwrap();
        let norm = |m: &LogisticModel| m.weights.dot(&m.weights);
        assert!(norm(&tight) < norm(&loose));
        assert_eq!(tight.n_features(), 5);
    }
}
