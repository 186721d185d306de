use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Webhook Router Module
///
/// Targets for Supabase database webhooks. Authenticated by a shared bearer
/// secret when `WEBHOOK_SECRET` is configured.
pub fn hook_routes() -> Router<AppState> {
    Router::new()
        // POST /api/hooks/new-message
        // Fired on INSERT into public.messages; sends one notification email.
        .route("/hooks/new-message", post(handlers::notify_new_message))
}
