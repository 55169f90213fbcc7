use std::path::Path;

use imdb_sql_bucket::BucketStore;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Present,
    Absent,
}

/// Presence probe for `key`. Only a not-found answer maps to `Absent`; every other
/// storage failure propagates.
///
/// The probe and the later upload are not atomic; a single scheduled publisher is assumed.
pub async fn probe<B>(store: &B, key: &str) -> Result<Presence>
where
    B: BucketStore + ?Sized,
{
    let presence = if store.object_exists(key).await? {
        Presence::Present
    } else {
        Presence::Absent
    };
    info!(bucket = store.bucket(), key, ?presence, "probed object store");
    Ok(presence)
}

pub async fn upload<B>(store: &B, key: &str, path: &Path) -> Result<()>
where
    B: BucketStore + ?Sized,
{
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }

    info!(bucket = store.bucket(), key, path = %path.display(), "uploading artifact");
    store.upload_file(key, path).await?;
    info!(bucket = store.bucket(), key, "upload complete");
    Ok(())
}
