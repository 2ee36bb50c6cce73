use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::{debug, warn};

use super::{sign, sparse_dot};
use crate::dataset::Label;

/// Hyperparameters for [`LinearSvc`].
#[derive(Debug, Clone)]
pub struct LinearSvcParams {
    c: f64,
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
}

impl LinearSvcParams {
    pub fn c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Stop once the projected-gradient spread falls below `tol`.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Seeds the order in which dual variables are visited.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Dual coordinate descent for the L2-regularised squared-hinge loss.
    /// The bias is learned as the weight of a constant extra feature, so it
    /// is regularised like any other weight.
    pub fn fit(&self, x: &CsMat<f64>, y: &[Label]) -> LinearSvc {
        let diag = 0.5 / self.c;
        let rows: Vec<CsVecView<'_, f64>> = x.outer_iterator().collect();
        let signs: Vec<f64> = y.iter().copied().map(sign).collect();
        let q_diag: Vec<f64> = rows.iter().map(|row| row.dot(row) + 1.0 + diag).collect();

        let mut weights = Array1::<f64>::zeros(x.cols());
        let mut bias = 0.0;
        let mut alpha = vec![0.0; rows.len()];
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut converged = false;
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            order.shuffle(&mut rng);

            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;
            for &i in &order {
                let row = &rows[i];
                let yi = signs[i];
                let g = yi * (sparse_dot(row, &weights) + bias) - 1.0 + diag * alpha[i];

                let pg = if alpha[i] == 0.0 { g.min(0.0) } else { g };
                pg_max = pg_max.max(pg);
                pg_min = pg_min.min(pg);

                if pg.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - g / q_diag[i]).max(0.0);
                    let delta = (alpha[i] - old) * yi;
                    for (j, &v) in row.iter() {
                        weights[j] += delta * v;
                    }
                    bias += delta;
                }
            }

            if pg_max - pg_min <= self.tolerance {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("LinearSVC converged after {} iterations", iterations);
        } else {
            warn!("LinearSVC reached {} iterations without converging", iterations);
        }

        LinearSvc { weights, bias }
    }
}

/// Linear large-margin classifier; exposes a decision margin but no
/// probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    weights: Array1<f64>,
    bias: f64,
}

impl LinearSvc {
    pub fn params() -> LinearSvcParams {
        LinearSvcParams {
            c: 1.0,
            max_iterations: 1000,
            tolerance: 1e-4,
            seed: 0,
        }
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn decision_function(&self, x: &CsVecView<'_, f64>) -> f64 {
        sparse_dot(x, &self.weights) + self.bias
    }

    pub fn predict(&self, x: &CsVecView<'_, f64>) -> Label {
        if self.decision_function(x) > 0.0 { Label::Spam } else { Label::Ham }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::toy_data;
    use sprs::CsVec;

    /// `0.5 * (|w|^2 + b^2) + C * sum(max(0, 1 - y * f(x))^2)`
    fn primal_objective(model: &LinearSvc, c: f64, x: &CsMat<f64>, y: &[Label]) -> f64 {
        let reg = 0.5 * (model.weights.dot(&model.weights) + model.bias * model.bias);
        let loss: f64 = x
            .outer_iterator()
            .zip(y)
            .map(|(row, label)| (1.0 - sign(*label) * model.decision_function(&row)).max(0.0).powi(2))
            .sum();
        reg + c * loss
    }

    #[test]
    fn test_margins_have_label_sign() {
        let (x, y) = toy_data();
        let model = LinearSvc::params().fit(&x, &y);
        for (row, label) in x.outer_iterator().zip(&y) {
            let margin = model.decision_function(&row);
            assert_eq!(margin > 0.0, label.is_spam(), "margin {margin}");
        }
    }

    #[test]
    fn test_default_tolerance_converges_tightly() {
        let (x, y) = toy_data();
        let params = LinearSvc::params();
        assert_eq!(params.tolerance, 1e-4);

        let tight = params.fit(&x, &y);
        let loose = LinearSvc::params().tolerance(0.5).max_iterations(1).fit(&x, &y);
        let objective = |m: &LinearSvc| primal_objective(m, 1.0, &x, &y);
        assert!(objective(&tight) <= objective(&loose) + 1e-3);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = toy_data();
        let a = LinearSvc::params().seed(7).fit(&x, &y);
        let b = LinearSvc::params().seed(7).fit(&x, &y);
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
        assert_eq!(a.n_features(), 5);
    }

    #[test]
    fn test_empty_row_scores_bias() {
        let (x, y) = toy_data();
        let model = LinearSvc::params().c(0.5).max_iterations(200).fit(&x, &y);
        let empty = CsVec::new(5, vec![], vec![]);
        assert_eq!(model.decision_function(&empty.view()), model.bias);
    }
}
