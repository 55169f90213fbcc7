use std::path::PathBuf;

use imdb_sql_bucket::S3Config;

use crate::cache::DEFAULT_CACHE_OUTPUT;
use crate::dataset::DEFAULT_BASE_URL;
use crate::error::{PipelineError, Result};

/// Artifact the cache generator reads unless told otherwise.
pub const DEFAULT_CACHE_ARTIFACT: &str = "imdb04-10-2025.parquet";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub base_url: String,
    pub s3: S3Config,
    pub cache_artifact: PathBuf,
    pub cache_output: PathBuf,
}

impl PipelineConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let data_dir = match var("IMDB_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    PipelineError::Config(
                        "IMDB_DATA_DIR is unset and no home directory could be determined".into(),
                    )
                })?
                .join("data")
                .join("imdb"),
        };

        let defaults = S3Config::default();
        let force_path_style = match var("S3_FORCE_PATH_STYLE") {
            Some(value) => parse_bool("S3_FORCE_PATH_STYLE", &value)?,
            None => defaults.force_path_style,
        };
        let s3 = S3Config {
            bucket: var("IMDB_S3_BUCKET").unwrap_or(defaults.bucket),
            region: var("S3_REGION").unwrap_or(defaults.region),
            endpoint: var("S3_ENDPOINT_URL"),
            access_key_id: var("S3_ACCESS_KEY_ID"),
            secret_access_key: var("S3_SECRET_ACCESS_KEY"),
            force_path_style,
        };

        let cache_artifact = var("IMDB_CACHE_ARTIFACT")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_CACHE_ARTIFACT));

        Ok(Self {
            base_url: var("IMDB_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cache_output: var("IMDB_CACHE_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_OUTPUT)),
            cache_artifact,
            data_dir,
            s3,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(PipelineError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
