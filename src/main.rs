use portfolio_site::{
    AppState,
    config::{AppConfig, Env},
    create_router, diagnostics,
    notifier::{MailerState, ResendMailer},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup order: configuration, logging, database pool, shared state, HTTP
/// server. Any failure before the server is listening aborts the process.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"));

    // 2. Logging, pretty locally and JSON in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_site=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.dev_bypass_enabled() {
        tracing::warn!(
            "local mode: the x-user-id header is accepted as a session; set APP_ENV=production for any deployed instance"
        );
    }

    // 3. Database pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Email provider
    if config.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY not set; message notifications will fail");
    }
    let mailer = Arc::new(ResendMailer::new(config.resend_api_key.clone())) as MailerState;

    // 5. Shared state
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        mailer,
        config,
        env_probe: diagnostics::process_env_probe(),
    };

    // 6. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated");
}
