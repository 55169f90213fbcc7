//! Naming of the dated parquet artifact. The object key in the bucket is the file name.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

pub const ARTIFACT_DATE_FORMAT: &str = "%d-%m-%Y";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn artifact_name(date: NaiveDate) -> String {
    format!("imdb{}.parquet", date.format(ARTIFACT_DATE_FORMAT))
}

pub fn object_key(date: NaiveDate) -> String {
    artifact_name(date)
}

pub fn artifact_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(artifact_name(date))
}
