//! Ingest the public title dataset into a dated parquet artifact, publish it, and
//! pre-compute the default query as a JSON cache document.

pub mod artifact;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod decompress;
pub mod error;
pub mod fetch;
pub mod join;
pub mod publish;
pub mod query;
pub mod workflows;

pub use error::{PipelineError, Result};
