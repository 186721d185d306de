use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Access Control:
/// There is no router-level layer here. The listings take the `AdminUser`
/// extractor (JSON 401/403 on failure); the delete routes take a
/// `SessionContext` and run the moderation workflow, which redirects to the
/// login page instead. Both paths look up `profiles.is_admin` on every call.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/blogs
        .route("/admin/blogs", get(handlers::get_admin_blogs))
        // GET /api/admin/projects
        .route("/admin/projects", get(handlers::get_admin_projects))
        // POST /api/blogs/{id}/delete
        // Submitted by the admin listing's delete form; answers with a 302.
        .route("/blogs/{id}/delete", post(handlers::delete_blog))
        // POST /api/projects/{id}/delete
        .route("/projects/{id}/delete", post(handlers::delete_project))
}
