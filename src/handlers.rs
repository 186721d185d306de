use crate::{
    AppState,
    auth::{AdminUser, SessionContext},
    diagnostics,
    error::ApiError,
    models::{
        BlogListResponse, BlogProbeResponse, BlogSample, ChangeEvent, ContentKind, EnvReport,
        ErrorBody, HealthResponse, NewsletterDiagnostics, NotificationSent, ProjectListResponse,
    },
    moderation, notifier,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

/// Number of posts returned by the blog probe.
const BLOG_SAMPLE_SIZE: i64 = 5;

// --- Admin Listings ---

/// get_admin_blogs
///
/// [Admin Route] Every blog post regardless of status, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/blogs",
    responses(
        (status = 200, description = "All posts", body = BlogListResponse),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 400, description = "Query rejected", body = ErrorBody)
    )
)]
pub async fn get_admin_blogs(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<BlogListResponse>, ApiError> {
    let blogs = state.repo.list_blogs().await?;
    Ok(Json(BlogListResponse { blogs }))
}

/// get_admin_projects
///
/// [Admin Route] Every project regardless of status, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/projects",
    responses(
        (status = 200, description = "All projects", body = ProjectListResponse),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 400, description = "Query rejected", body = ErrorBody)
    )
)]
pub async fn get_admin_projects(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let projects = state.repo.list_projects().await?;
    Ok(Json(ProjectListResponse { projects }))
}

// --- Delete Workflow ---

/// delete_blog
///
/// [Form Route] Deletes a blog post and redirects back to the admin listing.
/// Unauthenticated and non-admin callers are redirected to the login page
/// without any mutation. A backend failure is a JSON 5xx, never a redirect.
#[utoipa::path(
    post,
    path = "/api/blogs/{id}/delete",
    params(("id" = String, Path, description = "Blog post ID")),
    responses(
        (status = 302, description = "Redirect to /admin/blogs or to the login page"),
        (status = 500, description = "Backend unavailable", body = ErrorBody)
    )
)]
pub async fn delete_blog(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    delete_and_redirect(&state, &session, ContentKind::Blog, &id).await
}

/// delete_project
///
/// [Form Route] Same workflow as `delete_blog`, for portfolio projects.
#[utoipa::path(
    post,
    path = "/api/projects/{id}/delete",
    params(("id" = String, Path, description = "Project ID")),
    responses(
        (status = 302, description = "Redirect to /admin/projects or to the login page"),
        (status = 500, description = "Backend unavailable", body = ErrorBody)
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    delete_and_redirect(&state, &session, ContentKind::Project, &id).await
}

async fn delete_and_redirect(
    state: &AppState,
    session: &SessionContext,
    kind: ContentKind,
    id: &str,
) -> Result<Response, ApiError> {
    let outcome = moderation::delete_content(state.repo.as_ref(), session, kind, id).await?;
    let location = outcome.redirect_target(kind, &state.config.login_path);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

// --- Diagnostics ---

/// health
///
/// [Public Route] Liveness plus which configuration variables are present.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        env: diagnostics::env_presence(&state.env_probe),
    })
}

/// test_env
///
/// [Public Route] Runtime mode and variable presence. Never returns values.
#[utoipa::path(
    get,
    path = "/api/test-env",
    responses((status = 200, description = "Environment report", body = EnvReport))
)]
pub async fn test_env(State(state): State<AppState>) -> Json<EnvReport> {
    let env = diagnostics::env_presence(&state.env_probe);
    let missing = env.values().filter(|present| !**present).count();
    Json(EnvReport {
        message: format!("{} of {} variables set", env.len() - missing, env.len()),
        mode: state.config.env.as_str().to_string(),
        env,
    })
}

/// test_blog
///
/// [Public Route] Round-trips a small query against the blogs table.
#[utoipa::path(
    get,
    path = "/api/test-blog",
    responses(
        (status = 200, description = "Query succeeded", body = BlogProbeResponse),
        (status = 500, description = "Query failed", body = ErrorBody)
    )
)]
pub async fn test_blog(State(state): State<AppState>) -> Result<Json<BlogProbeResponse>, ApiError> {
    let count = state.repo.count_blogs().await.map_err(diagnostic_failure)?;
    let recent = state
        .repo
        .recent_blogs(BLOG_SAMPLE_SIZE)
        .await
        .map_err(diagnostic_failure)?;

    Ok(Json(BlogProbeResponse {
        ok: true,
        count: count.max(0) as usize,
        sample: recent.iter().map(BlogSample::from).collect(),
    }))
}

/// debug_newsletters
///
/// [Public Route] All newsletter issues next to the publicly visible ones.
#[utoipa::path(
    get,
    path = "/api/debug/newsletters",
    responses(
        (status = 200, description = "Visibility report", body = NewsletterDiagnostics),
        (status = 500, description = "Query failed", body = ErrorBody)
    )
)]
pub async fn debug_newsletters(
    State(state): State<AppState>,
) -> Result<Json<NewsletterDiagnostics>, ApiError> {
    let all = state
        .repo
        .list_newsletters()
        .await
        .map_err(diagnostic_failure)?;
    let public = state
        .repo
        .list_public_newsletters()
        .await
        .map_err(diagnostic_failure)?;
    Ok(Json(diagnostics::newsletter_report(all, public)))
}

// Diagnostics report every failure as a 500, including rejected queries.
fn diagnostic_failure(err: crate::error::BackendError) -> ApiError {
    ApiError::Internal(err.to_string())
}

// --- Notifications ---

/// notify_new_message
///
/// [Webhook Route] Called by the database webhook when a message row is
/// inserted. Sends one notification email; nothing is retried.
#[utoipa::path(
    post,
    path = "/api/hooks/new-message",
    request_body = ChangeEvent,
    responses(
        (status = 200, description = "Email sent", body = NotificationSent),
        (status = 401, description = "Bad webhook secret", body = ErrorBody),
        (status = 502, description = "Email provider failed", body = ErrorBody)
    )
)]
pub async fn notify_new_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<ChangeEvent>,
) -> Result<Json<NotificationSent>, ApiError> {
    if let Some(secret) = &state.config.webhook_secret {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(secret.as_str()) {
            return Err(ApiError::Unauthenticated);
        }
    }

    tracing::info!(
        event_type = event.event_type.as_deref().unwrap_or("unknown"),
        table = event.table.as_deref().unwrap_or("unknown"),
        sender_id = %event.record.sender_id,
        "message event received"
    );

    let to = state
        .config
        .notify_to
        .as_deref()
        .ok_or_else(|| ApiError::Notification("NOTIFY_TO is not configured".to_string()))?;

    let email = notifier::message_email(&event.record, &state.config.notify_from, to);
    let id = state
        .mailer
        .send(&email)
        .await
        .map_err(|e| ApiError::Notification(e.to_string()))?;

    tracing::info!(message_id = %id, "notification email sent");
    Ok(Json(NotificationSent {
        sent: true,
        id: Some(id),
    }))
}
