//! The two linear pipelines: ingest-and-publish, and cache generation.
//!
//! They are independent commands. Cache generation reads whatever artifact sits at
//! its configured path; it is not wired to the artifact an ingest run just produced.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use imdb_sql_bucket::BucketStore;
use serde::Serialize;
use tracing::info;

use crate::artifact::{artifact_path, object_key};
use crate::cache::{write_cache, CacheSummary};
use crate::config::PipelineConfig;
use crate::decompress::decompress_all;
use crate::error::Result;
use crate::fetch::{fetch_all, HttpSource};
use crate::join::{write_joined, JoinOutcome};
use crate::publish::{probe, upload, Presence};
use crate::query::QueryRunner;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Today's key already exists remotely; nothing was joined or uploaded.
    AlreadyPublished { bucket: String, key: String },
    Published {
        bucket: String,
        key: String,
        artifact: PathBuf,
        join: JoinOutcome,
    },
}

/// Fetch -> decompress -> probe -> join -> upload, for the artifact dated `date`.
pub async fn run_ingest<S, B>(
    config: &PipelineConfig,
    source: &S,
    store: &B,
    date: NaiveDate,
) -> Result<IngestOutcome>
where
    S: HttpSource + ?Sized,
    B: BucketStore + ?Sized,
{
    let data_dir = config.data_dir.as_path();

    fetch_all(source, &config.base_url, data_dir).await?;
    decompress_all(data_dir)?;

    let key = object_key(date);
    let bucket = store.bucket().to_string();
    if probe(store, &key).await? == Presence::Present {
        info!(%bucket, %key, "artifact already published, skipping");
        return Ok(IngestOutcome::AlreadyPublished { bucket, key });
    }

    let artifact = artifact_path(data_dir, date);
    let join = write_joined(data_dir, &artifact)?;
    upload(store, &key, &artifact).await?;

    Ok(IngestOutcome::Published {
        bucket,
        key,
        artifact,
        join,
    })
}

/// Runs the default query against `artifact` and writes the cache document to `output`.
pub fn generate_cache(artifact: &Path, output: &Path) -> Result<CacheSummary> {
    let mut runner = QueryRunner::open(artifact)?;
    let mut df = runner.run_default()?;
    write_cache(&mut df, output)
}
