use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

pub const DEFAULT_CACHE_OUTPUT: &str = "public/default_query_cache.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

impl CacheSummary {
    pub fn kilobytes(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }
}

/// Writes `df` to `path` as one JSON array of row objects, keys in column order.
/// The file is replaced on every call.
pub fn write_cache(df: &mut DataFrame, path: &Path) -> Result<CacheSummary> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    JsonWriter::new(&mut writer)
        .with_json_format(JsonFormat::Json)
        .finish(df)?;
    writer.flush()?;
    drop(writer);

    let summary = CacheSummary {
        path: path.to_path_buf(),
        rows: df.height(),
        bytes: std::fs::metadata(path)?.len(),
    };
    info!(path = %path.display(), rows = summary.rows, bytes = summary.bytes, "wrote cache document");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn rows_round_trip_with_column_names_as_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("public").join("cache.json");
        let mut df = df!(
            "titleId" => ["tt0111161", "tt0068646"],
            "numVotes" => [3_000_000i64, 2_000_000],
            "region" => [None::<&str>, Some("GB")],
        )
        .unwrap();

        let summary = write_cache(&mut df, &path).unwrap();

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.bytes, std::fs::metadata(&path).unwrap().len());

        let parsed: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"titleId": "tt0111161", "numVotes": 3_000_000, "region": null},
                {"titleId": "tt0068646", "numVotes": 2_000_000, "region": "GB"},
            ])
        );
    }

    #[test]
    fn keys_follow_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut df = df!("zeta" => [1i64], "alpha" => [2i64]).unwrap();

        write_cache(&mut df, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn rewrites_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "[{\"stale\": true}, {\"stale\": true}, {\"stale\": true}]").unwrap();

        let mut df = df!("titleId" => ["tt1"]).unwrap();
        let summary = write_cache(&mut df, &path).unwrap();

        assert_eq!(summary.rows, 1);
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, json!([{"titleId": "tt1"}]));
    }

    #[test]
    fn kilobytes_are_binary() {
        let summary = CacheSummary {
            path: PathBuf::from("cache.json"),
            rows: 0,
            bytes: 2048,
        };
        assert_eq!(summary.kilobytes(), 2.0);
    }
}
