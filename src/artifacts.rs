//! Persistence of the fitted vectorizer and the selected model.
//!
//! Each object lives in its own MessagePack file. A pair is only usable when
//! the model was fitted on the vectorizer's feature space, which is checked
//! whenever [`Artifacts`] are built.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rmp_serde::{decode::from_read, encode::write_named};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::ArtifactsConfig;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::tfidf::TfidfVectorizer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub vectorizer: PathBuf,
    pub model: PathBuf,
}

impl From<&ArtifactsConfig> for ArtifactPaths {
    fn from(config: &ArtifactsConfig) -> Self {
        Self {
            vectorizer: config.vectorizer_path.clone(),
            model: config.model_path.clone(),
        }
    }
}

/// The pair the service needs to answer predictions.
#[derive(Debug, Clone)]
pub struct Artifacts {
    vectorizer: TfidfVectorizer,
    model: Model,
}

impl Artifacts {
    /// Pairs a vectorizer with a model fitted on its output.
    pub fn new(vectorizer: TfidfVectorizer, model: Model) -> Result<Self> {
        check_pair(&vectorizer, &model)?;
        Ok(Self { vectorizer, model })
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

fn check_pair(vectorizer: &TfidfVectorizer, model: &Model) -> Result<()> {
    if vectorizer.n_features() != model.n_features() {
        return Err(Error::ArtifactMismatch {
            vectorizer: vectorizer.n_features(),
            model: model.n_features(),
        });
    }
    Ok(())
}

/// Saves both blobs, replacing existing files. Each file is written to a
/// temporary sibling and renamed into place, so a failed write never leaves
/// a truncated blob behind.
pub fn save(paths: &ArtifactPaths, vectorizer: &TfidfVectorizer, model: &Model) -> Result<()> {
    check_pair(vectorizer, model)?;
    save_to_file(&paths.vectorizer, vectorizer)?;
    save_to_file(&paths.model, model)?;
    info!("💾 Saved artifacts: {:?}, {:?}", paths.vectorizer, paths.model);
    Ok(())
}

/// Loads both blobs. Every missing file is reported in a single error.
pub fn load(paths: &ArtifactPaths) -> Result<Artifacts> {
    let missing: Vec<PathBuf> = [&paths.vectorizer, &paths.model]
        .into_iter()
        .filter(|p| !p.exists())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingArtifacts { missing });
    }

    let vectorizer: TfidfVectorizer = load_from_file(&paths.vectorizer)?;
    let model: Model = load_from_file(&paths.model)?;
    let artifacts = Artifacts::new(vectorizer, model)?;
    info!(
        "📦 Loaded {} with {} features from {:?}",
        artifacts.model.name(),
        artifacts.vectorizer.n_features(),
        paths.model
    );
    Ok(artifacts)
}

fn save_to_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(parent)?;
    let mut writer = BufWriter::new(tmp);
    write_named(&mut writer, value)?;
    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(from_read(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use crate::model::ModelKind;

    fn fitted() -> (TfidfVectorizer, Model) {
        let docs = ["win a free prize now", "free entry win cash", "see you at lunch", "lunch at noon then"];
        let labels = [Label::Spam, Label::Spam, Label::Ham, Label::Ham];
        let vectorizer = TfidfVectorizer::fit(&docs).unwrap();
        let x = vectorizer.transform_all(&docs);
        let model = ModelKind::LinearSvm.fit(&x, &labels, 42).unwrap();
        (vectorizer, model)
    }

    fn paths(dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            vectorizer: dir.join("app").join("vectorizer.msgpack"),
            model: dir.join("app").join("model.msgpack"),
        }
    }

    #[test]
    fn test_saved_artifacts_predict_identically() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let (vectorizer, model) = fitted();
        save(&paths, &vectorizer, &model).unwrap();

        let loaded = load(&paths).unwrap();
        assert_eq!(loaded.model.kind(), ModelKind::LinearSvm);
        assert_eq!(loaded.vectorizer.vocabulary(), vectorizer.vocabulary());

        let text = "free prize at lunch";
        let x = vectorizer.transform(text);
        assert_eq!(loaded.vectorizer.transform(text), x);
        assert_eq!(
            loaded.model.decision_function(&x.view()),
            model.decision_function(&x.view())
        );
    }

    #[test]
    fn test_mismatched_pair_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let (vectorizer, model) = fitted();
        save(&paths, &vectorizer, &model).unwrap();

        let wider = TfidfVectorizer::fit(&[
            "a completely different vocabulary here",
            "with many more distinct terms than before",
            "so the feature spaces cannot line up",
        ])
        .unwrap();
        assert_ne!(wider.n_features(), model.n_features());
        save_to_file(&paths.vectorizer, &wider).unwrap();

        match load(&paths) {
            Err(Error::ArtifactMismatch { vectorizer, model: expected }) => {
                assert_eq!(vectorizer, wider.n_features());
                assert_eq!(expected, model.n_features());
            }
            other => panic!("expected ArtifactMismatch, got {other:?}"),
        }
        assert!(matches!(
            save(&paths, &wider, &model),
            Err(Error::ArtifactMismatch { .. })
        ));
        assert!(Artifacts::new(wider, model).is_err());
    }

    #[test]
    fn test_save_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let (vectorizer, model) = fitted();
        save(&paths, &vectorizer, &model).unwrap();
        save(&paths, &vectorizer, &model).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path().join("app"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["model.msgpack", "vectorizer.msgpack"]);
        assert!(load(&paths).is_ok());
    }

    #[test]
    fn test_missing_files_are_all_named() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        match load(&paths) {
            Err(Error::MissingArtifacts { missing }) => {
                assert_eq!(missing, vec![paths.vectorizer.clone(), paths.model.clone()]);
            }
            other => panic!("expected MissingArtifacts, got {other:?}"),
        }

        let (vectorizer, model) = fitted();
        save(&paths, &vectorizer, &model).unwrap();
        fs::remove_file(&paths.model).unwrap();
        match load(&paths) {
            Err(Error::MissingArtifacts { missing }) => assert_eq!(missing, vec![paths.model.clone()]),
            other => panic!("expected MissingArtifacts, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_blob_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        let (vectorizer, model) = fitted();
        save(&paths, &vectorizer, &model).unwrap();
        fs::write(&paths.model, b"not msgpack").unwrap();
        assert!(matches!(load(&paths), Err(Error::Decode(_))));
    }
}
