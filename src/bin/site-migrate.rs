use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use portfolio_site::migrations::{self, MigrationError, Target, VerifyReport};
use sqlx::postgres::PgPoolOptions;

/// Apply or verify schema migrations on the hosted QA / production databases.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one migration file inside a transaction.
    Apply {
        #[arg(long, value_enum)]
        env: Target,
        file: PathBuf,
        /// Required when targeting production.
        #[arg(long)]
        yes: bool,
    },
    /// Check that the tables and columns the site needs exist.
    Verify {
        #[arg(long, value_enum)]
        env: Target,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_migrate=info,portfolio_site=info".into()),
        )
        .init();

    let args = Args::parse();
    match run(args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), MigrationError> {
    match command {
        Command::Apply { env, file, yes } => {
            if env == Target::Production && !yes {
                return Err(MigrationError::ConfirmationRequired);
            }
            let sql = migrations::read_migration(&file)?;
            let pool = connect(env).await?;

            tracing::info!("applying {} to {:?}", file.display(), env);
            let report = migrations::apply_and_report(&pool, &sql).await?;
            tracing::info!("migration applied");
            log_report(env, &report);
            Ok(())
        }
        Command::Verify { env } => {
            let pool = connect(env).await?;
            let report = migrations::verify_schema(&pool).await?;
            log_report(env, &report);
            report.into_result()
        }
    }
}

fn log_report(env: Target, report: &VerifyReport) {
    for table in &report.missing_tables {
        tracing::warn!("missing table: {}", table);
    }
    for column in &report.missing_columns {
        tracing::warn!("missing column: {}", column);
    }
    if report.is_complete() {
        tracing::info!("{:?} schema verified", env);
    }
}

async fn connect(target: Target) -> Result<sqlx::PgPool, MigrationError> {
    let options = migrations::connect_options(target, |key| std::env::var(key).ok())?;
    Ok(PgPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?)
}
