use std::fs::File;
use std::path::Path;

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::{AKAS_TSV, BASICS_TSV, RATINGS_TSV};
use crate::error::{PipelineError, Result};

pub const NULL_SENTINEL: &str = "\\N";
pub const INFER_SCHEMA_LENGTH: usize = 10_000;

pub const DETAIL_COLUMNS: [&str; 4] = ["titleId", "title", "region", "language"];
pub const BASICS_COLUMNS: [&str; 5] = ["tconst", "startYear", "genres", "primaryTitle", "titleType"];

/// Column order of the joined artifact.
pub const JOINED_COLUMNS: [&str; 10] = [
    "titleId",
    "title",
    "region",
    "language",
    "averageRating",
    "numVotes",
    "startYear",
    "genres",
    "primaryTitle",
    "titleType",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinOutcome {
    Written { rows: usize },
    Skipped,
}

/// Lazily scans one of the tab-separated dataset files.
///
/// Rows that fail to parse are tolerated rather than failing the scan, quoting is
/// disabled (titles contain bare `"`), and `\N` is read as null.
pub fn scan_tsv(path: &Path) -> Result<LazyFrame> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }

    let lf = LazyCsvReader::new(path)
        .with_separator(b'\t')
        .with_encoding(CsvEncoding::Utf8)
        .with_ignore_errors(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .with_quote_char(None)
        .with_null_values(Some(NullValues::AllColumnsSingle(NULL_SENTINEL.into())))
        .finish()?;

    Ok(lf)
}

fn project(lf: LazyFrame, columns: &[&str]) -> LazyFrame {
    lf.select(columns.iter().map(|name| col(*name)).collect::<Vec<_>>())
}

/// Builds the lazy plan: akas details joined with ratings, then with basics, on the title id.
pub fn joined_frame(dir: &Path) -> Result<LazyFrame> {
    let ratings = scan_tsv(&dir.join(RATINGS_TSV))?;
    let details = project(scan_tsv(&dir.join(AKAS_TSV))?, &DETAIL_COLUMNS);
    let basics = project(scan_tsv(&dir.join(BASICS_TSV))?, &BASICS_COLUMNS);

    let joined = details
        .join(
            ratings,
            [col("titleId")],
            [col("tconst")],
            JoinArgs::new(JoinType::Inner),
        )
        .join(
            basics,
            [col("titleId")],
            [col("tconst")],
            JoinArgs::new(JoinType::Inner),
        );

    Ok(joined)
}

/// Materializes the joined table into `dest` unless a file is already there.
pub fn write_joined(dir: &Path, dest: &Path) -> Result<JoinOutcome> {
    if dest.exists() {
        info!(artifact = %dest.display(), "joined artifact already on disk, skipping join");
        return Ok(JoinOutcome::Skipped);
    }

    let mut df = joined_frame(dir)?.collect()?;
    debug!("malformed source rows are skipped by the scanner and not counted");

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(dest)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut df)?;

    let rows = df.height();
    info!(artifact = %dest.display(), rows, "wrote joined artifact");
    Ok(JoinOutcome::Written { rows })
}
