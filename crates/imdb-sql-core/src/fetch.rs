use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::dataset::{download_url, local_path, DATASET_FILES};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Downloaded { bytes: u64 },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub name: String,
    pub path: PathBuf,
    pub status: FetchStatus,
}

/// Transport used to pull one remote file onto local disk.
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Writes the full body of `url` to `dest` and returns the byte count.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Stream into a sibling `.part` file so an interrupted transfer never
        // satisfies the presence check on the next run.
        let partial = partial_path(dest);
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, dest).await?;
        Ok(written)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads every dataset file not already present in `dir`.
pub async fn fetch_all<S>(source: &S, base_url: &str, dir: &Path) -> Result<Vec<FetchReport>>
where
    S: HttpSource + ?Sized,
{
    fetch_files(source, base_url, dir, &DATASET_FILES).await
}

pub async fn fetch_files<S>(
    source: &S,
    base_url: &str,
    dir: &Path,
    names: &[&str],
) -> Result<Vec<FetchReport>>
where
    S: HttpSource + ?Sized,
{
    let mut reports = Vec::with_capacity(names.len());

    for name in names {
        let dest = local_path(dir, name);
        if dest.exists() {
            info!(file = %name, "already downloaded, skipping");
            reports.push(FetchReport {
                name: name.to_string(),
                path: dest,
                status: FetchStatus::Skipped,
            });
            continue;
        }

        tokio::fs::create_dir_all(dir).await?;

        let url = download_url(base_url, name);
        info!(file = %name, %url, "downloading");
        let bytes = source.download(&url, &dest).await?;
        info!(file = %name, bytes, "download complete");

        reports.push(FetchReport {
            name: name.to_string(),
            path: dest,
            status: FetchStatus::Downloaded { bytes },
        });
    }

    Ok(reports)
}
