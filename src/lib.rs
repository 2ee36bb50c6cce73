//! # hamspam 📨🚫
//!
//! Train an SMS spam classifier and serve its predictions over HTTP.
//!
//! Built around the [UCI SMS Spam Collection](https://archive.ics.uci.edu/dataset/228/sms+spam+collection):
//! messages are turned into TF-IDF vectors over word unigrams and bigrams, three
//! classic linear/probabilistic classifiers are compared on a held-out split, and
//! the one with the best spam F1 score is saved next to its vectorizer.
//!
//! ## Features
//! - Dataset download + normalisation into a `label,text` CSV
//! - TF-IDF vectorizer (unigrams + bigrams, `min_df`, 20k term cap) producing
//!   [`sprs`](https://crates.io/crates/sprs) CSR matrices
//! - Multinomial Naive Bayes ([`linfa-bayes`](https://crates.io/crates/linfa-bayes)),
//!   Logistic Regression ([`linfa-logistic`](https://crates.io/crates/linfa-logistic))
//!   and a squared-hinge Linear SVM as candidates
//! - Accuracy / precision / recall / F1 comparison, rendered as a PNG heatmap
//! - Model persistence with `rmp-serde` (MessagePack)
//! - `axum` service with `GET /` and `POST /predict`
//! - Benchmarkable with [Criterion](https://crates.io/crates/criterion)
//!
//! ## Example
//! ```rust,no_run
//! use std::path::Path;
//! use hamspam::{dataset, trainer, TrainOptions};
//!
//! let corpus = dataset::load_corpus(
//!     Path::new("train/sms_spam.csv"),
//!     Path::new("train/sms_spam_sample.csv"),
//! )?;
//! let report = trainer::train(&corpus, &TrainOptions::default())?;
//! let x = report.vectorizer.transform("Free entry! Win a prize now");
//! println!("{} -> {}", report.model.name(), report.model.predict(&x.view()));
//! # Ok::<(), hamspam::Error>(())
//! ```

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod download;
pub mod error;
pub mod heatmap;
pub mod metrics;
pub mod model;
pub mod service;
pub mod tfidf;
pub mod trainer;

pub use artifacts::{ArtifactPaths, Artifacts};
pub use config::Config;
pub use dataset::{CorpusRow, Label};
pub use error::{Error, Result};
pub use metrics::EvaluationRecord;
pub use model::{Model, ModelKind, ScoreStrategy};
pub use service::{AppState, Prediction, Predictor};
pub use tfidf::TfidfVectorizer;
pub use trainer::{TrainOptions, TrainingReport};
