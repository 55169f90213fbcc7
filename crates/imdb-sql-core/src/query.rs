use std::path::{Path, PathBuf};

use polars::prelude::*;
use polars::sql::SQLContext;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Name the artifact is registered under inside the SQL context.
pub const VIEW_NAME: &str = "parquet_data";

pub const EXCLUDED_COLUMNS: [&str; 3] = ["titleType", "primaryTitle", "language"];

/// The front-end's default query. `{table}` is replaced with the registered view name.
pub const DEFAULT_QUERY_TEMPLATE: &str = "SELECT * EXCLUDE (titleType, primaryTitle, language)
FROM {table}
WHERE
(region IS NULL AND
numVotes >= 100000 AND
titleType = 'movie' AND
startYear >= 2015)
ORDER BY (numVotes * averageRating + 700000) / (numVotes + 100000) DESC
LIMIT 100";

pub fn render_query(table: &str) -> String {
    DEFAULT_QUERY_TEMPLATE.replace("{table}", table)
}

/// Owns the SQL context for one invocation; dropping the runner releases the registration.
pub struct QueryRunner {
    ctx: SQLContext,
    artifact: PathBuf,
}

impl QueryRunner {
    pub fn open(artifact: &Path) -> Result<Self> {
        if !artifact.exists() {
            return Err(PipelineError::MissingInput(artifact.to_path_buf()));
        }

        let lf = LazyFrame::scan_parquet(artifact, ScanArgsParquet::default())?;
        let mut ctx = SQLContext::new();
        ctx.register(VIEW_NAME, lf);

        Ok(Self {
            ctx,
            artifact: artifact.to_path_buf(),
        })
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn run(&mut self, sql: &str) -> Result<DataFrame> {
        let df = self.ctx.execute(sql)?.collect()?;
        Ok(df)
    }

    pub fn run_default(&mut self) -> Result<DataFrame> {
        let df = self.run(&render_query(VIEW_NAME))?;
        info!(artifact = %self.artifact.display(), rows = df.height(), "ran default query");
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use polars::io::parquet::write::ParquetWriter;

    use super::*;

    fn write_fixture(path: &Path) {
        let mut df = df!(
            "titleId" => ["tt_popular", "tt_niche", "tt_regional", "tt_few_votes", "tt_series", "tt_old"],
            "title" => ["Popular", "Niche", "Regional", "Few Votes", "Series", "Old"],
            "region" => [None::<&str>, None, Some("US"), None, None, None],
            "language" => [None::<&str>, None, Some("en"), None, None, None],
            "averageRating" => [7.9f64, 8.0, 9.5, 9.9, 9.0, 9.1],
            "numVotes" => [1_000_000i64, 200_000, 900_000, 50_000, 800_000, 700_000],
            "startYear" => [2018i64, 2020, 2021, 2022, 2019, 2010],
            "genres" => ["Drama", "Comedy", "Drama", "Horror", "Crime", "Western"],
            "primaryTitle" => ["Popular", "Niche", "Regional", "Few Votes", "Series", "Old"],
            "titleType" => ["movie", "movie", "movie", "movie", "tvSeries", "movie"],
        )
        .unwrap();
        ParquetWriter::new(File::create(path).unwrap())
            .finish(&mut df)
            .unwrap();
    }

    #[test]
    fn template_targets_the_registered_view() {
        let sql = render_query(VIEW_NAME);
        assert!(sql.contains("FROM parquet_data"));
        assert!(!sql.contains("{table}"));
    }

    #[test]
    fn weighted_rating_orders_rows_that_pass_the_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imdb.parquet");
        write_fixture(&path);

        let mut runner = QueryRunner::open(&path).unwrap();
        let df = runner.run_default().unwrap();

        // (1e6 * 7.9 + 7e5) / 1.1e6 = 7.82 beats (2e5 * 8.0 + 7e5) / 3e5 = 7.67
        let ids: Vec<Option<&str>> = df.column("titleId").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("tt_popular"), Some("tt_niche")]);
    }

    #[test]
    fn excluded_columns_are_not_projected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imdb.parquet");
        write_fixture(&path);

        let df = QueryRunner::open(&path).unwrap().run_default().unwrap();

        assert_eq!(
            df.get_column_names_str(),
            vec!["titleId", "title", "region", "averageRating", "numVotes", "startYear", "genres"]
        );
        for excluded in EXCLUDED_COLUMNS {
            assert!(df.column(excluded).is_err());
        }
    }

    #[test]
    fn result_is_capped_at_one_hundred_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imdb.parquet");
        let n = 150;
        let ids: Vec<String> = (0..n).map(|i| format!("tt{i:07}")).collect();
        let mut df = df!(
            "titleId" => ids.clone(),
            "title" => ids.clone(),
            "region" => vec![None::<&str>; n],
            "language" => vec![None::<&str>; n],
            "averageRating" => (0..n).map(|i| 5.0 + i as f64 / 100.0).collect::<Vec<_>>(),
            "numVotes" => vec![150_000i64; n],
            "startYear" => vec![2016i64; n],
            "genres" => vec!["Drama"; n],
            "primaryTitle" => ids,
            "titleType" => vec!["movie"; n],
        )
        .unwrap();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let out = QueryRunner::open(&path).unwrap().run_default().unwrap();

        assert_eq!(out.height(), 100);
        let first = out.column("titleId").unwrap().str().unwrap().get(0);
        assert_eq!(first, Some("tt0000149"));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = QueryRunner::open(&dir.path().join("absent.parquet")).err().unwrap();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }
}
