//! Fits every candidate, scores it on the held-out split and keeps the best.

use tracing::info;

use crate::artifacts::{self, ArtifactPaths};
use crate::config::Config;
use crate::dataset::{self, CorpusRow, Label};
use crate::error::{Error, Result};
use crate::heatmap;
use crate::metrics::{self, EvaluationRecord};
use crate::model::{Model, ModelKind};
use crate::tfidf::TfidfVectorizer;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

/// Outcome of a training run. `records` keeps candidate order.
#[derive(Debug)]
pub struct TrainingReport {
    pub records: Vec<EvaluationRecord>,
    pub best: usize,
    pub vectorizer: TfidfVectorizer,
    pub model: Model,
}

impl TrainingReport {
    pub fn best_record(&self) -> &EvaluationRecord {
        &self.records[self.best]
    }
}

/// Index of the highest F1. Ties go to the earliest record.
pub fn select_best(records: &[EvaluationRecord]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, record) in records.iter().enumerate() {
        match best {
            Some(b) if records[b].f1 >= record.f1 => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Splits the corpus, fits the vectorizer on the training half, then fits and
/// evaluates each candidate in [`ModelKind::ALL`] order.
pub fn train(corpus: &[CorpusRow], options: &TrainOptions) -> Result<TrainingReport> {
    if corpus.is_empty() {
        return Err(Error::Training("corpus is empty".to_string()));
    }

    let split = dataset::train_test_split(corpus, options.test_ratio, options.seed);
    info!(
        "🧠 Training on {} rows, evaluating on {} rows",
        split.train.len(),
        split.test.len()
    );

    let train_text: Vec<&str> = split.train.iter().map(|r| r.text.as_str()).collect();
    let test_text: Vec<&str> = split.test.iter().map(|r| r.text.as_str()).collect();
    let y_train: Vec<Label> = split.train.iter().map(|r| r.label).collect();
    let y_test: Vec<Label> = split.test.iter().map(|r| r.label).collect();

    let vectorizer = TfidfVectorizer::fit(&train_text)?;
    let x_train = vectorizer.transform_all(&train_text);
    let x_test = vectorizer.transform_all(&test_text);

    let mut records = Vec::with_capacity(ModelKind::ALL.len());
    let mut models = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let model = kind.fit(&x_train, &y_train, options.seed)?;
        let predicted = model.predict_all(&x_test);
        let record = metrics::evaluate(kind.name(), &y_test, &predicted);
        info!("{}: acc={:.4} f1={:.4}", record.model, record.accuracy, record.f1);
        records.push(record);
        models.push(model);
    }

    let best = select_best(&records)
        .ok_or_else(|| Error::Training("no candidate models".to_string()))?;
    let model = models.swap_remove(best);
    info!("Best model by F1: {} (f1={:.4})", records[best].model, records[best].f1);

    Ok(TrainingReport {
        records,
        best,
        vectorizer,
        model,
    })
}

/// End-to-end training step: corpus → report → heatmap + artifacts.
pub fn run(config: &Config) -> Result<TrainingReport> {
    let corpus = dataset::load_corpus(&config.dataset.csv_path, &config.dataset.sample_path)?;
    let options = TrainOptions {
        test_ratio: config.training.test_ratio,
        seed: config.training.seed,
    };
    let report = train(&corpus, &options)?;

    heatmap::render(&report.records, &config.training.heatmap_path)?;
    artifacts::save(
        &ArtifactPaths::from(&config.artifacts),
        &report.vectorizer,
        &report.model,
    )?;
    Ok(report)
}
