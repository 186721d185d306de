//! Authorization-gated delete workflow for blog posts and projects.
//!
//! Every call runs the full sequence again: session → profile lookup →
//! `is_admin` check → delete. Nothing about a caller is cached between
//! requests.

use uuid::Uuid;

use crate::{
    auth::SessionContext,
    error::BackendError,
    models::{ContentKind, Profile},
    repository::Repository,
};

/// Authorization
///
/// Result of the authentication and authorization steps shared by the delete
/// workflow and the `AdminUser` extractor.
#[derive(Debug, Clone, PartialEq)]
pub enum Authorization {
    /// No session resolved.
    Anonymous,
    /// Session resolved but the profile is missing or not an admin.
    Denied { user_id: Uuid },
    Granted(Profile),
}

/// authorize
///
/// Steps 1 and 2 of the workflow. A backend failure during the profile lookup
/// is returned as an error, never treated as "not an admin".
pub async fn authorize(
    repo: &dyn Repository,
    session: &SessionContext,
) -> Result<Authorization, BackendError> {
    let Some(user) = &session.user else {
        return Ok(Authorization::Anonymous);
    };

    match repo.get_profile(user.id).await? {
        Some(profile) if profile.is_admin => Ok(Authorization::Granted(profile)),
        _ => Ok(Authorization::Denied { user_id: user.id }),
    }
}

/// DeleteOutcome
///
/// Every way a delete request can end, short of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Unauthenticated,
    Forbidden,
    /// A row was removed.
    Deleted,
    /// The caller was authorized but no row had that id (already gone).
    NotFound,
}

impl DeleteOutcome {
    /// redirect_target
    ///
    /// Where the browser is sent for this outcome. `Deleted` and `NotFound`
    /// share the listing page so repeating a delete looks the same as the
    /// first attempt.
    pub fn redirect_target(&self, kind: ContentKind, login_path: &str) -> String {
        match self {
            DeleteOutcome::Unauthenticated => login_path.to_string(),
            DeleteOutcome::Forbidden => format!("{login_path}?error=forbidden"),
            DeleteOutcome::Deleted | DeleteOutcome::NotFound => kind.listing_path().to_string(),
        }
    }
}

/// delete_content
///
/// Runs the workflow for one item. Mutation only happens after a granted
/// authorization; at most one row is removed. Any UUID spelling is accepted
/// (uppercase, simple or braced); an id that is not a UUID at all matches
/// nothing and never reaches the backend.
pub async fn delete_content(
    repo: &dyn Repository,
    session: &SessionContext,
    kind: ContentKind,
    id: &str,
) -> Result<DeleteOutcome, BackendError> {
    let profile = match authorize(repo, session).await? {
        Authorization::Anonymous => {
            tracing::info!(kind = kind.label(), %id, "delete refused: no session");
            return Ok(DeleteOutcome::Unauthenticated);
        }
        Authorization::Denied { user_id } => {
            tracing::warn!(kind = kind.label(), %id, %user_id, "delete refused: not an admin");
            return Ok(DeleteOutcome::Forbidden);
        }
        Authorization::Granted(profile) => profile,
    };

    let Ok(row_id) = Uuid::parse_str(id) else {
        tracing::info!(kind = kind.label(), %id, admin = %profile.id, "delete id is not a uuid");
        return Ok(DeleteOutcome::NotFound);
    };

    let removed = repo.delete_content(kind, row_id).await?;
    if removed > 0 {
        tracing::info!(kind = kind.label(), %id, admin = %profile.id, "content deleted");
        Ok(DeleteOutcome::Deleted)
    } else {
        tracing::info!(kind = kind.label(), %id, admin = %profile.id, "delete matched no rows");
        Ok(DeleteOutcome::NotFound)
    }
}
