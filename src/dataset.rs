//! Labelled message corpus: parsing, CSV persistence and the train/test split.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Message class. `Spam` is the positive class for every metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Ham, Label::Spam];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }

    pub fn is_spam(&self) -> bool {
        matches!(self, Label::Spam)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ham" => Ok(Label::Ham),
            "spam" => Ok(Label::Spam),
            other => Err(Error::InvalidLabel(other.to_string())),
        }
    }
}

/// One labelled message. `text` is trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusRow {
    pub label: Label,
    pub text: String,
}

impl CorpusRow {
    /// Builds a row from raw label/text, or `None` if either is unusable.
    pub fn parse(label: &str, text: &str) -> Option<Self> {
        let label = label.trim().parse().ok()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            label,
            text: text.to_string(),
        })
    }
}

/// Parses `label<TAB>message` lines, silently dropping malformed ones.
pub fn parse_collection(raw: &str) -> Vec<CorpusRow> {
    raw.lines()
        .filter_map(|line| {
            let (label, text) = line.split_once('\t')?;
            CorpusRow::parse(label, text)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    label: String,
    text: String,
}

/// Reads a `label,text` CSV. Unknown labels and empty texts are dropped.
pub fn read_csv(path: &Path) -> Result<Vec<CorpusRow>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.deserialize::<CsvRow>() {
        let record = result?;
        match CorpusRow::parse(&record.label, &record.text) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} unusable rows from {:?}", dropped, path);
    }
    Ok(rows)
}

/// Writes rows as a `label,text` CSV with a header, replacing any existing file.
pub fn write_csv(path: &Path, rows: &[CorpusRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    wtr.write_record(["label", "text"])?;
    for row in rows {
        wtr.write_record([row.label.as_str(), row.text.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Loads the downloaded corpus, falling back to the bundled sample.
pub fn load_corpus(main: &Path, sample: &Path) -> Result<Vec<CorpusRow>> {
    if main.exists() {
        let rows = read_csv(main)?;
        info!("📦 Loaded {} rows from {:?}", rows.len(), main);
        return Ok(rows);
    }
    if !sample.exists() {
        return Err(Error::NotFound(format!(
            "neither {} nor the fallback sample {} exists; run `hamspam download` first",
            main.display(),
            sample.display()
        )));
    }
    warn!("{:?} not found. Using small fallback sample dataset.", main);
    let rows = read_csv(sample)?;
    info!("📦 Loaded {} rows from {:?}", rows.len(), sample);
    Ok(rows)
}

/// Train/test halves of a corpus.
#[derive(Debug)]
pub struct DatasetSplit {
    pub train: Vec<CorpusRow>,
    pub test: Vec<CorpusRow>,
}

/// Deterministic split driven by `seed`, stratified by label when both
/// classes are present.
pub fn train_test_split(data: &[CorpusRow], test_ratio: f64, seed: u64) -> DatasetSplit {
    let mut rng = StdRng::seed_from_u64(seed);

    let groups: Vec<Vec<CorpusRow>> = Label::ALL
        .iter()
        .map(|label| data.iter().filter(|r| r.label == *label).cloned().collect())
        .filter(|g: &Vec<CorpusRow>| !g.is_empty())
        .collect();

    let stratify = groups.len() > 1;
    let groups = if stratify { groups } else { vec![data.to_vec()] };

    let mut train = Vec::new();
    let mut test = Vec::new();
    for mut group in groups {
        group.shuffle(&mut rng);
        let mut test_size = ((group.len() as f64) * test_ratio).round() as usize;
        if stratify && group.len() >= 2 {
            test_size = test_size.clamp(1, group.len() - 1);
        }
        let rest = group.split_off(test_size.min(group.len()));
        test.extend(group);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    DatasetSplit { train, test }
}
