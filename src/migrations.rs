//! Applying and verifying schema migrations against the hosted QA and
//! production databases. Driven by the `site-migrate` binary.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use sqlx::{PgPool, postgres::PgConnectOptions};
use thiserror::Error;

/// Tables the site cannot run without.
pub const REQUIRED_TABLES: [&str; 4] = ["profiles", "blogs", "projects", "newsletters"];

/// Columns the handlers depend on, as (table, column).
pub const REQUIRED_COLUMNS: [(&str, &str); 1] = [("profiles", "is_admin")];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{0} is not set")]
    MissingUrl(String),
    #[error("invalid database url in {var}: {source}")]
    InvalidUrl {
        var: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} contains no SQL")]
    EmptyFile(PathBuf),
    #[error("refusing to touch production without --yes")]
    ConfirmationRequired,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("schema incomplete: {0}")]
    Incomplete(String),
}

/// Target
///
/// A named hosted environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    Qa,
    Production,
}

impl Target {
    fn suffix(&self) -> &'static str {
        match self {
            Target::Qa => "QA",
            Target::Production => "PRODUCTION",
        }
    }

    pub fn url_var(&self) -> String {
        format!("SUPABASE_DB_URL_{}", self.suffix())
    }

    pub fn password_var(&self) -> String {
        format!("SUPABASE_DB_PASSWORD_{}", self.suffix())
    }
}

/// connect_options
///
/// Builds connection options from the target's URL/credential pair. A
/// separately stored password overrides whatever the URL carries.
pub fn connect_options<F>(target: Target, lookup: F) -> Result<PgConnectOptions, MigrationError>
where
    F: Fn(&str) -> Option<String>,
{
    let url_var = target.url_var();
    let url = lookup(&url_var)
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| MigrationError::MissingUrl(url_var.clone()))?;

    let options = PgConnectOptions::from_str(url.trim())
        .map_err(|source| MigrationError::InvalidUrl { var: url_var, source })?;

    Ok(match lookup(&target.password_var()).filter(|p| !p.is_empty()) {
        Some(password) => options.password(&password),
        None => options,
    })
}

/// read_migration
///
/// Loads a migration file, rejecting files with nothing but whitespace and
/// `--` comments.
pub fn read_migration(path: &Path) -> Result<String, MigrationError> {
    let sql = std::fs::read_to_string(path).map_err(|source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let has_statements = sql
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"));
    if !has_statements {
        return Err(MigrationError::EmptyFile(path.to_path_buf()));
    }
    Ok(sql)
}

/// apply_migration
///
/// Executes the whole file inside one transaction; a failing statement rolls
/// back everything before it.
pub async fn apply_migration(pool: &PgPool, sql: &str) -> Result<(), MigrationError> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(sql).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}

/// apply_and_report
///
/// Applies one file, then reads back what the schema still lacks. An
/// incomplete schema is returned in the report rather than as an error:
/// incremental migrations legitimately land on partial databases, and the
/// strict check is `VerifyReport::into_result`.
pub async fn apply_and_report(pool: &PgPool, sql: &str) -> Result<VerifyReport, MigrationError> {
    apply_migration(pool, sql).await?;
    verify_schema(pool).await
}

/// VerifyReport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub missing_tables: Vec<String>,
    pub missing_columns: Vec<String>,
}

impl VerifyReport {
    /// Compares what the database has against the required schema.
    pub fn compare(tables: &[String], columns: &[(String, String)]) -> Self {
        let missing_tables = REQUIRED_TABLES
            .iter()
            .filter(|required| !tables.iter().any(|t| t == *required))
            .map(|t| t.to_string())
            .collect();

        let missing_columns = REQUIRED_COLUMNS
            .iter()
            .filter(|(table, column)| {
                !columns.iter().any(|(t, c)| t == table && c == column)
            })
            .map(|(table, column)| format!("{table}.{column}"))
            .collect();

        Self {
            missing_tables,
            missing_columns,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_tables.is_empty() && self.missing_columns.is_empty()
    }

    pub fn into_result(self) -> Result<(), MigrationError> {
        if self.is_complete() {
            return Ok(());
        }
        let missing: Vec<String> = self
            .missing_tables
            .into_iter()
            .chain(self.missing_columns)
            .collect();
        Err(MigrationError::Incomplete(missing.join(", ")))
    }
}

/// verify_schema
///
/// Reads the `public` schema from `information_schema` and reports what is missing.
pub async fn verify_schema(pool: &PgPool) -> Result<VerifyReport, MigrationError> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'public'",
    )
    .fetch_all(pool)
    .await?;

    let columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name::text, column_name::text FROM information_schema.columns \
         WHERE table_schema = 'public'",
    )
    .fetch_all(pool)
    .await?;

    Ok(VerifyReport::compare(&tables, &columns))
}
