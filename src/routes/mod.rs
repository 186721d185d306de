/// Router Module Index
///
/// Splits the API by who may call it. Every router here is nested under
/// `/api` by `create_router`.

/// Health and diagnostic endpoints. Read-only, no session required.
pub mod public;

/// Admin listings and the delete workflow. Every handler re-checks the
/// caller's profile on each request.
pub mod admin;

/// Endpoints called by the backend itself (database webhooks).
pub mod hooks;
