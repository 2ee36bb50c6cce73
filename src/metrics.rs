use serde::Serialize;

use crate::dataset::Label;

/// Held-out scores for one candidate, with spam as the positive class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub model: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvaluationRecord {
    pub const METRICS: [&'static str; 4] = ["accuracy", "precision", "recall", "f1"];

    pub fn values(&self) -> [f64; 4] {
        [self.accuracy, self.precision, self.recall, self.f1]
    }
}

/// Scores `predicted` against `truth`. Any ratio with a zero denominator is
/// reported as 0.
pub fn evaluate(model: &str, truth: &[Label], predicted: &[Label]) -> EvaluationRecord {
    debug_assert_eq!(truth.len(), predicted.len());

    let mut correct = 0usize;
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (t, p) in truth.iter().zip(predicted) {
        if t == p {
            correct += 1;
        }
        match (t.is_spam(), p.is_spam()) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationRecord {
        model: model.to_string(),
        accuracy: ratio(correct, truth.len()),
        precision,
        recall,
        f1,
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 { 0.0 } else { num as f64 / denom as f64 }
}
