//! One-shot acquisition of the medicine dataset from Kaggle.
//!
//! The dataset is downloaded as a zip archive, the medicine CSV is extracted from it and written
//! to the configured dataset path. The file is written next to its destination first and then
//! renamed, so a failed download never leaves a truncated CSV behind.

use crate::config::{DatasetConfig, KaggleCredentials};
use crate::error::AcquisitionError;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub struct KaggleDownloader {
    client: reqwest::Client,
    url: String,
    credentials: KaggleCredentials,
}

impl KaggleDownloader {
    /// Build a downloader for `slug` (`owner/dataset`) against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AcquisitionError::Http` if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &str,
        slug: &str,
        credentials: KaggleCredentials,
    ) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: format!(
                "{}/api/v1/datasets/download/{}",
                base_url.trim_end_matches('/'),
                slug
            ),
            credentials,
        })
    }

    /// Build a downloader from dataset configuration.
    ///
    /// # Errors
    ///
    /// Returns `AcquisitionError::NoCredentials` when no Kaggle credentials were resolved.
    pub fn from_config(cfg: &DatasetConfig) -> Result<Self, AcquisitionError> {
        let credentials = cfg
            .credentials()
            .cloned()
            .ok_or(AcquisitionError::NoCredentials)?;
        Self::new(cfg.kaggle_base_url(), cfg.slug(), credentials)
    }

    /// Download the dataset archive and write its medicine CSV to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an `AcquisitionError` when the request fails, the registry rejects it, the archive
    /// is unreadable or holds no CSV, or the file cannot be written.
    pub async fn download_to(&self, dest: &Path) -> Result<(), AcquisitionError> {
        tracing::info!("Downloading medicine dataset from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcquisitionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let archive = response.bytes().await?;
        let (entry_name, csv) = extract_medicine_csv(&archive)?;
        tracing::info!("Extracted {} ({} bytes)", entry_name, csv.len());

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        persist(dest, &csv).await?;

        tracing::info!("Dataset saved to {}", dest.display());
        Ok(())
    }
}

/// Pick the CSV to keep from a dataset archive.
///
/// Prefers the first `.csv` entry whose name mentions "medicine", falling back to the first
/// `.csv` entry of any name.
fn extract_medicine_csv(archive: &[u8]) -> Result<(String, Vec<u8>), AcquisitionError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;

    let mut first_csv = None;
    let mut medicine_csv = None;
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_lowercase();
        if !name.ends_with(".csv") {
            continue;
        }
        if first_csv.is_none() {
            first_csv = Some(i);
        }
        if medicine_csv.is_none() && name.contains("medicine") {
            medicine_csv = Some(i);
        }
    }

    let idx = medicine_csv
        .or(first_csv)
        .ok_or(AcquisitionError::NoCsvInArchive)?;
    let mut entry = zip.by_index(idx)?;
    let name = entry.name().to_string();
    let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry.read_to_end(&mut contents)?;
    Ok((name, contents))
}

/// Write `contents` next to `dest` and rename it into place. The partial file is removed on any
/// failure.
async fn persist(dest: &Path, contents: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(dest);
    let written = match tokio::fs::write(&partial, contents).await {
        Ok(()) => tokio::fs::rename(&partial, dest).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
