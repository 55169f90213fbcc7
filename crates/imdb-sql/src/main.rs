use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use imdb_sql_bucket::S3BucketStore;
use imdb_sql_core::artifact;
use imdb_sql_core::config::PipelineConfig;
use imdb_sql_core::fetch::ReqwestSource;
use imdb_sql_core::workflows::{self, IngestOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build, publish and pre-query the IMDb title dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download, decompress and join the dataset, then upload today's parquet artifact
    Ingest(IngestArgs),
    /// Run the default query against a local artifact and write the JSON cache
    GenerateCache(GenerateCacheArgs),
}

#[derive(Args, Debug, Default)]
struct IngestArgs {
    /// Local directory holding downloads and the dated artifact
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Bucket the artifact is published to
    #[arg(long)]
    bucket: Option<String>,
    /// Base URL the dataset files are fetched from
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Args, Debug, Default)]
struct GenerateCacheArgs {
    /// Parquet artifact to query
    #[arg(long)]
    artifact: Option<PathBuf>,
    /// Where the JSON cache document is written
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Ingest(args) => handle_ingest(config, args).await,
        Command::GenerateCache(args) => handle_generate_cache(config, args),
    }
}

async fn handle_ingest(mut config: PipelineConfig, args: IngestArgs) -> Result<()> {
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(bucket) = args.bucket {
        config.s3.bucket = bucket;
    }
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let source = ReqwestSource::new().context("failed to build HTTP client")?;
    let store = S3BucketStore::new(config.s3.clone())
        .await
        .context("failed to configure object store")?;

    let date = artifact::today();
    info!(data_dir = %config.data_dir.display(), %date, "starting ingest");

    let outcome = workflows::run_ingest(&config, &source, &store, date)
        .await
        .context("ingest workflow failed")?;

    match outcome {
        IngestOutcome::AlreadyPublished { bucket, key } => {
            println!("File {key} already exists in S3 bucket {bucket}. Skipping.");
        }
        IngestOutcome::Published {
            bucket,
            key,
            artifact,
            ..
        } => {
            println!("Done! Created {}", artifact.display());
            println!("Successfully uploaded to s3://{bucket}/{key}");
        }
    }

    Ok(())
}

fn handle_generate_cache(config: PipelineConfig, args: GenerateCacheArgs) -> Result<()> {
    let artifact = args.artifact.unwrap_or(config.cache_artifact);
    let output = args.output.unwrap_or(config.cache_output);

    let summary = workflows::generate_cache(&artifact, &output).with_context(|| {
        format!("failed to generate cache from {}", artifact.display())
    })?;

    println!(
        "Generated cache with {} rows at {}",
        summary.rows,
        summary.path.display()
    );
    println!("File size: {:.2} KB", summary.kilobytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ingest_overrides() {
        let cli = Cli::parse_from([
            "imdb-sql",
            "ingest",
            "--data-dir",
            "/srv/imdb",
            "--bucket",
            "staging",
        ]);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.data_dir, Some(PathBuf::from("/srv/imdb")));
                assert_eq!(args.bucket.as_deref(), Some("staging"));
                assert!(args.base_url.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_generate_cache_paths() {
        let cli = Cli::parse_from([
            "imdb-sql",
            "generate-cache",
            "--artifact",
            "imdb04-10-2025.parquet",
            "--output",
            "public/cache.json",
        ]);
        match cli.command {
            Command::GenerateCache(args) => {
                assert_eq!(args.artifact, Some(PathBuf::from("imdb04-10-2025.parquet")));
                assert_eq!(args.output, Some(PathBuf::from("public/cache.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
