use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use portfolio_site::{
    AppConfig, AppState, InMemoryRepository, MockMailer, create_router,
    diagnostics::{self, RECOGNIZED_VARS},
    error::BackendError,
    models::{BlogListResponse, BlogPost, NewsletterIssue, Profile, Project, ProjectListResponse},
    repository::Repository,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

const ADMIN_ID: Uuid = Uuid::from_u128(0xA);
const READER_ID: Uuid = Uuid::from_u128(0xB);

// --- Test Utilities ---

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
    mailer: Arc<MockMailer>,
}

fn blog(n: u128, day: u32) -> BlogPost {
    BlogPost {
        id: Uuid::from_u128(n),
        title: format!("Post {n}"),
        slug: format!("post-{n}"),
        content: "body".into(),
        status: "published".into(),
        created_at: Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap(),
        ..BlogPost::default()
    }
}

fn project(n: u128, day: u32) -> Project {
    Project {
        id: Uuid::from_u128(n),
        title: format!("Project {n}"),
        status: "published".into(),
        created_at: Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
        ..Project::default()
    }
}

fn seeded_repo() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_profile(Profile {
            id: ADMIN_ID,
            email: None,
            is_admin: true,
        })
        .with_profile(Profile {
            id: READER_ID,
            email: None,
            is_admin: false,
        })
        .with_blog(blog(1, 1))
        .with_blog(blog(3, 3))
        .with_blog(blog(2, 2))
        .with_project(project(10, 10))
        .with_project(project(11, 11))
}

fn spawn_app_with(repo: InMemoryRepository, mailer: MockMailer, config: AppConfig) -> TestApp {
    let repo = Arc::new(repo);
    let mailer = Arc::new(mailer);
    let state = AppState {
        repo: repo.clone(),
        mailer: mailer.clone(),
        config,
        env_probe: diagnostics::fixed_env_probe(["DATABASE_URL", "SUPABASE_URL"]),
    };
    TestApp {
        router: create_router(state),
        repo,
        mailer,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(seeded_repo(), MockMailer::new(), AppConfig::default())
}

fn as_user(builder: axum::http::request::Builder, id: Uuid) -> axum::http::request::Builder {
    builder.header("x-user-id", id.to_string())
}

async fn send(app: &TestApp, request: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
}

fn delete_request(kind: &str, id: &str, user: Option<Uuid>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(format!("/api/{kind}/{id}/delete"));
    let builder = match user {
        Some(id) => as_user(builder, id),
        None => builder,
    };
    builder.body(Body::empty()).unwrap()
}

// --- Admin Listings ---

#[tokio::test]
async fn test_admin_blogs_newest_first() {
    let app = spawn_app();
    let request = as_user(Request::builder().uri("/api/admin/blogs"), ADMIN_ID)
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let list: BlogListResponse = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<Uuid> = list.blogs.iter().map(|b| b.id).collect();
    assert_eq!(
        ids,
        vec![Uuid::from_u128(3), Uuid::from_u128(2), Uuid::from_u128(1)]
    );
}

#[tokio::test]
async fn test_admin_projects_payload_key() {
    let app = spawn_app();
    let request = as_user(Request::builder().uri("/api/admin/projects"), ADMIN_ID)
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let list: ProjectListResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(list.projects[0].id, Uuid::from_u128(11));
    assert_eq!(list.projects.len(), 2);
}

#[tokio::test]
async fn test_admin_listing_rejects_anonymous_and_readers() {
    let app = spawn_app();

    let anonymous = Request::builder()
        .uri("/api/admin/blogs")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, anonymous).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "authentication required");

    let reader = as_user(Request::builder().uri("/api/admin/projects"), READER_ID)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, reader).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_listing_query_error_is_json() {
    let app = spawn_app_with(
        InMemoryRepository::failing(BackendError::Query("relation \"blogs\" does not exist".into())),
        MockMailer::new(),
        AppConfig::default(),
    );
    let request = as_user(Request::builder().uri("/api/admin/blogs"), ADMIN_ID)
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "relation \"blogs\" does not exist"
    );
}

// --- Delete Workflow ---

#[tokio::test]
async fn test_admin_delete_redirects_to_listing() {
    let app = spawn_app();
    let id = Uuid::from_u128(2).to_string();

    let response = send(&app, delete_request("blogs", &id, Some(ADMIN_ID))).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/admin/blogs");
    let remaining = app.repo.list_blogs().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|b| b.id.to_string() != id));
}

#[tokio::test]
async fn test_delete_without_session_redirects_to_login() {
    let app = spawn_app();

    let response = send(&app, delete_request("projects", "10", None)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
    assert_eq!(app.repo.delete_calls(), 0);
}

#[tokio::test]
async fn test_delete_by_reader_redirects_to_login() {
    let app = spawn_app();
    let id = Uuid::from_u128(10).to_string();

    let response = send(&app, delete_request("projects", &id, Some(READER_ID))).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?error=forbidden");
    assert_eq!(app.repo.list_projects().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_twice_is_idempotent() {
    let app = spawn_app();
    let id = Uuid::from_u128(11).to_string();

    let first = send(&app, delete_request("projects", &id, Some(ADMIN_ID))).await;
    let second = send(&app, delete_request("projects", &id, Some(ADMIN_ID))).await;

    assert_eq!(first.status(), StatusCode::FOUND);
    assert_eq!(second.status(), StatusCode::FOUND);
    assert_eq!(location(&first), location(&second));
    assert_eq!(app.repo.delete_calls(), 2);
}

#[tokio::test]
async fn test_delete_backend_failure_is_5xx() {
    let app = spawn_app_with(
        InMemoryRepository::failing(BackendError::Unavailable("timeout".into())),
        MockMailer::new(),
        AppConfig::default(),
    );

    let response = send(&app, delete_request("blogs", "1", Some(ADMIN_ID))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_delete_mutation_failure_is_5xx_without_redirect() {
    let repo = InMemoryRepository::failing_deletes(BackendError::Unavailable("timeout".into()))
        .with_profile(Profile {
            id: ADMIN_ID,
            email: None,
            is_admin: true,
        })
        .with_blog(blog(1, 1));
    let app = spawn_app_with(repo, MockMailer::new(), AppConfig::default());

    let id = Uuid::from_u128(1).to_string();
    let response = send(&app, delete_request("blogs", &id, Some(ADMIN_ID))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert_eq!(app.repo.delete_calls(), 1);
    assert_eq!(app.repo.count_blogs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_accepts_uppercase_id() {
    let app = spawn_app();
    let id = Uuid::from_u128(2).to_string().to_uppercase();

    let response = send(&app, delete_request("blogs", &id, Some(ADMIN_ID))).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/admin/blogs");
    assert_eq!(app.repo.count_blogs().await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_with_malformed_id_touches_nothing() {
    let app = spawn_app();

    let response = send(&app, delete_request("blogs", "not-a-uuid", Some(ADMIN_ID))).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/admin/blogs");
    assert_eq!(app.repo.delete_calls(), 0);
    assert_eq!(app.repo.count_blogs().await.unwrap(), 3);
}

#[tokio::test]
async fn test_delete_honours_custom_login_path() {
    let config = AppConfig {
        login_path: "/auth/sign-in".into(),
        ..AppConfig::default()
    };
    let app = spawn_app_with(seeded_repo(), MockMailer::new(), config);

    let response = send(&app, delete_request("blogs", "1", None)).await;
    assert_eq!(location(&response), "/auth/sign-in");
}

// --- Diagnostics ---

#[tokio::test]
async fn test_health_reports_presence_only() {
    let app = spawn_app();
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
    let env = json["env"].as_object().unwrap();
    assert_eq!(env.len(), RECOGNIZED_VARS.len());
    assert!(env.values().all(Value::is_boolean));
    assert_eq!(env["DATABASE_URL"], true);
    assert_eq!(env["RESEND_API_KEY"], false);
}

#[tokio::test]
async fn test_env_endpoint_reports_mode() {
    let app = spawn_app();
    let request = Request::builder()
        .uri("/api/test-env")
        .body(Body::empty())
        .unwrap();

    let json = body_json(send(&app, request).await).await;
    assert_eq!(json["mode"], "local");
    assert_eq!(json["message"], "2 of 8 variables set");
    assert!(json["env"].as_object().unwrap().values().all(Value::is_boolean));
}

#[tokio::test]
async fn test_blog_probe_samples_recent_posts() {
    let app = spawn_app();
    let request = Request::builder()
        .uri("/api/test-blog")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["count"], 3);
    assert_eq!(json["sample"][0]["title"], "Post 3");
}

#[tokio::test]
async fn test_blog_probe_failure_is_500() {
    let app = spawn_app_with(
        InMemoryRepository::failing(BackendError::Query("permission denied for table blogs".into())),
        MockMailer::new(),
        AppConfig::default(),
    );
    let request = Request::builder()
        .uri("/api/test-blog")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "permission denied for table blogs"
    );
}

#[tokio::test]
async fn test_newsletter_debug_lists_hidden_issues() {
    let issue = |n: u128, status: &str, is_public: bool| NewsletterIssue {
        id: Uuid::from_u128(n),
        subject: format!("Issue {n}"),
        status: status.into(),
        is_public,
        created_at: Utc.with_ymd_and_hms(2024, 7, n as u32, 0, 0, 0).unwrap(),
        ..NewsletterIssue::default()
    };
    let repo = InMemoryRepository::new()
        .with_newsletter(issue(1, "published", true))
        .with_newsletter(issue(2, "published", false))
        .with_newsletter(issue(3, "draft", true));
    let app = spawn_app_with(repo, MockMailer::new(), AppConfig::default());
    let request = Request::builder()
        .uri("/api/debug/newsletters")
        .body(Body::empty())
        .unwrap();

    let json = body_json(send(&app, request).await).await;
    assert_eq!(json["all_count"], 3);
    assert_eq!(json["public_count"], 1);
    assert_eq!(json["hidden_count"], 2);
    assert_eq!(
        json["hidden_ids"],
        serde_json::json!([Uuid::from_u128(3), Uuid::from_u128(2)])
    );
}

// --- Webhook ---

fn message_event() -> Value {
    serde_json::json!({
        "type": "INSERT",
        "table": "messages",
        "record": {
            "content": "Loved the last post!",
            "sender_id": "3f1c7a1e-0000-0000-0000-000000000001",
            "created_at": "2024-08-01T10:00:00Z"
        }
    })
}

fn hook_request(body: &Value, bearer: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/api/hooks/new-message")
        .header(header::CONTENT_TYPE, "application/json");
    let builder = match bearer {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    };
    builder.body(Body::from(body.to_string())).unwrap()
}

fn notifying_config() -> AppConfig {
    AppConfig {
        notify_to: Some("owner@example.com".into()),
        webhook_secret: Some("hook-secret".into()),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_message_hook_sends_one_email() {
    let app = spawn_app_with(seeded_repo(), MockMailer::new(), notifying_config());

    let response = send(&app, hook_request(&message_event(), Some("hook-secret"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["sent"], true);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["owner@example.com".to_string()]);
    assert!(sent[0].html.contains("Loved the last post!"));
}

#[tokio::test]
async fn test_message_hook_rejects_wrong_secret() {
    let app = spawn_app_with(seeded_repo(), MockMailer::new(), notifying_config());

    let response = send(&app, hook_request(&message_event(), Some("guess"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_message_hook_provider_failure_is_502() {
    let app = spawn_app_with(seeded_repo(), MockMailer::new_failing(), notifying_config());

    let response = send(&app, hook_request(&message_event(), Some("hook-secret"))).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
