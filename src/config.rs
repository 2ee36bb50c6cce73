use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// UCI SMS Spam Collection archive.
pub const DEFAULT_DATASET_URL: &str =
    "https://archive.ics.uci.edu/static/public/228/sms%2Bspam%2Bcollection.zip";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub artifacts: ArtifactsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub url: String,
    pub csv_path: PathBuf,
    /// Small bundled corpus used when `csv_path` has not been downloaded yet.
    pub sample_path: PathBuf,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub heatmap_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub vectorizer_path: PathBuf,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATASET_URL.to_string(),
            csv_path: PathBuf::from("train/sms_spam.csv"),
            sample_path: PathBuf::from("train/sms_spam_sample.csv"),
            download_timeout_secs: 60,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            heatmap_path: PathBuf::from("train/metrics_heatmap.png"),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            vectorizer_path: PathBuf::from("app/vectorizer.msgpack"),
            model_path: PathBuf::from("app/model.msgpack"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads a TOML config file. A missing file yields the defaults, with
    /// paths relative to the working directory. Relative paths inside a file
    /// are resolved against the directory holding that file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Joins every relative file path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let paths = [
            &mut self.dataset.csv_path,
            &mut self.dataset.sample_path,
            &mut self.training.heatmap_path,
            &mut self.artifacts.vectorizer_path,
            &mut self.artifacts.model_path,
        ];
        for path in paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if !(0.0..1.0).contains(&config.training.test_ratio) {
            return Err(Error::Config(format!(
                "training.test_ratio must be in [0, 1), got {}",
                config.training.test_ratio
            )));
        }
        Ok(config)
    }
}
