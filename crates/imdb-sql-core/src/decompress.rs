use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use tracing::info;

use crate::dataset::COMPRESSED_SUFFIX;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecompressStatus {
    Decompressed { bytes: u64 },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecompressReport {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub status: DecompressStatus,
}

/// Decompresses every `*.tsv.gz` in `dir` next to itself, skipping outputs that already exist.
pub fn decompress_all(dir: &Path) -> Result<Vec<DecompressReport>> {
    let pattern = format!(
        "{}/*.tsv{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        COMPRESSED_SUFFIX
    );

    let mut sources = Vec::new();
    for entry in glob::glob(&pattern)? {
        sources.push(entry.map_err(glob::GlobError::into_error)?);
    }
    sources.sort();

    let mut reports = Vec::with_capacity(sources.len());
    for source in sources {
        let dest = decompressed_path(&source);
        if dest.exists() {
            info!(file = %dest.display(), "already decompressed, skipping");
            reports.push(DecompressReport {
                source,
                dest,
                status: DecompressStatus::Skipped,
            });
            continue;
        }

        let bytes = decompress_file(&source, &dest)?;
        info!(file = %dest.display(), bytes, "decompressed");
        reports.push(DecompressReport {
            source,
            dest,
            status: DecompressStatus::Decompressed { bytes },
        });
    }

    Ok(reports)
}

/// Streams every gzip member of `source` into `dest`; returns the decompressed size.
pub fn decompress_file(source: &Path, dest: &Path) -> Result<u64> {
    let input = BufReader::new(File::open(source)?);
    let mut decoder = MultiGzDecoder::new(input);
    let mut output = BufWriter::new(File::create(dest)?);
    let bytes = io::copy(&mut decoder, &mut output)?;
    output.flush()?;
    Ok(bytes)
}

fn decompressed_path(source: &Path) -> PathBuf {
    match source.file_stem() {
        Some(stem) => source.with_file_name(stem),
        None => source.to_path_buf(),
    }
}
