//! Fetches the SMS Spam Collection archive and turns it into a CSV corpus.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use tracing::info;
use zip::ZipArchive;

use crate::dataset::{self, CorpusRow};
use crate::error::{Error, Result};

/// Suffix (lowercased) of the archive entry holding `label<TAB>message` lines.
pub const COLLECTION_ENTRY: &str = "smsspamcollection";

/// Downloads the archive. Non-2xx responses are errors; nothing is retried.
pub async fn fetch_archive(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    info!("Downloading: {}", url);
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(bytes.to_vec())
}

/// Returns the decoded text of the collection entry inside a ZIP archive.
pub fn extract_collection(archive: &[u8]) -> Result<String> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;

    let target = zip
        .file_names()
        .find(|name| name.to_lowercase().ends_with(COLLECTION_ENTRY))
        .map(str::to_string);

    let Some(target) = target else {
        let mut found: Vec<&str> = zip.file_names().collect();
        found.sort_unstable();
        return Err(Error::NotFound(format!(
            "SMSSpamCollection not found in zip. Found: {found:?}"
        )));
    };

    let mut entry = zip.by_name(&target)?;
    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Extracts and parses the archive, then writes the CSV. If the collection
/// entry is missing, `out` is left untouched.
pub fn prepare_from_archive(archive: &[u8], out: &Path) -> Result<Vec<CorpusRow>> {
    let raw = extract_collection(archive)?;
    let rows = dataset::parse_collection(&raw);
    dataset::write_csv(out, &rows)?;
    info!("💾 Saved {} rows to {:?}", rows.len(), out);
    Ok(rows)
}

/// Full preparation step: download, extract, normalise, write.
pub async fn prepare(url: &str, out: &Path, timeout: Duration) -> Result<usize> {
    let archive = fetch_archive(url, timeout).await?;
    let rows = prepare_from_archive(&archive, out)?;
    Ok(rows.len())
}
