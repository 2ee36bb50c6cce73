use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid label: {0:?}")]
    InvalidLabel(String),

    #[error("Empty vocabulary: no terms left after fitting")]
    EmptyVocabulary,

    #[error("Training error: {0}")]
    Training(String),

    #[error("Failed to serialize artifact: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to deserialize artifact: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{}", missing_artifacts_message(.missing))]
    MissingArtifacts { missing: Vec<PathBuf> },

    #[error(
        "Artifact mismatch: vectorizer has {vectorizer} features but the model expects {model}; retrain with `hamspam train`"
    )]
    ArtifactMismatch { vectorizer: usize, model: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn missing_artifacts_message(missing: &[PathBuf]) -> String {
    let paths = missing
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Model artifacts not found:\n{paths}\nRun training first:\n  hamspam download\n  hamspam train"
    )
}
