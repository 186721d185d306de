use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod migrations;
pub mod models;
pub mod moderation;
pub mod notifier;
pub mod repository;

// Routers split by caller (public diagnostics, admin, backend webhooks).
pub mod routes;
use routes::{admin, hooks, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use diagnostics::EnvProbe;
pub use notifier::{MailerState, MockMailer, ResendMailer};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `/api` route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_admin_blogs, handlers::get_admin_projects,
        handlers::delete_blog, handlers::delete_project,
        handlers::health, handlers::test_env, handlers::test_blog,
        handlers::debug_newsletters, handlers::notify_new_message
    ),
    components(
        schemas(
            models::BlogPost, models::Project, models::NewsletterIssue, models::Profile,
            models::BlogListResponse, models::ProjectListResponse, models::ErrorBody,
            models::HealthResponse, models::EnvReport, models::BlogProbeResponse,
            models::BlogSample, models::NewsletterDiagnostics, models::ChangeEvent,
            models::MessageRecord, models::NotificationSent,
        )
    ),
    tags(
        (name = "portfolio-site", description = "Blog, portfolio and newsletter admin API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a handler can reach, built once at startup and cloned per
/// request. All members are immutable or internally synchronised.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: the hosted Postgres backend (or the in-memory stand-in).
    pub repo: RepositoryState,
    /// Transactional email provider.
    pub mailer: MailerState,
    pub config: AppConfig,
    /// Presence checks for configuration variables, used by diagnostics.
    pub env_probe: EnvProbe,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree under `/api`, the Swagger UI, and the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .merge(public::public_routes())
        .merge(admin::admin_routes())
        .merge(hooks::hook_routes());

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID: a UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the request ID back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
