//! The fixed set of remote dataset files and where they land locally.

use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://datasets.imdbws.com";

pub const COMPRESSED_SUFFIX: &str = ".gz";

pub const DATASET_FILES: [&str; 7] = [
    "name.basics.tsv.gz",
    "title.akas.tsv.gz",
    "title.basics.tsv.gz",
    "title.crew.tsv.gz",
    "title.episode.tsv.gz",
    "title.principals.tsv.gz",
    "title.ratings.tsv.gz",
];

pub const AKAS_TSV: &str = "title.akas.tsv";
pub const BASICS_TSV: &str = "title.basics.tsv";
pub const RATINGS_TSV: &str = "title.ratings.tsv";

pub fn download_url(base_url: &str, name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), name)
}

pub fn local_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
