use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::Profile,
    moderation::{self, Authorization},
    repository::RepositoryState,
};

/// Cookie the site's auth helpers store the Supabase access token in.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Header accepted as a session in `Env::Local` only.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// The subset of a Supabase access token this service reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the `auth.users.id`, which is also the `profiles.id`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Postgres role the token maps to ("authenticated"); not an app role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// SessionUser
///
/// The identity resolved from a request's session. Carries no privilege;
/// authorization is a separate profile lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// SessionContext
///
/// Explicit per-request session context, built once by the extractor and
/// passed into the workflows that need it. Extraction never rejects: an
/// absent or invalid session is `user: None`, and each workflow decides what
/// that means for its response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub user: Option<SessionUser>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn for_user(id: Uuid) -> Self {
        Self {
            user: Some(SessionUser { id, email: None }),
        }
    }

    /// resolve
    ///
    /// Resolves the session carried by `headers`:
    /// 1. Local bypass: in `Env::Local`, a UUID in `x-user-id` is accepted as-is.
    /// 2. Token: `Authorization: Bearer <jwt>`, falling back to the session cookie.
    /// 3. Validation: HS256 signature with the project's JWT secret and `exp`.
    pub fn resolve(headers: &HeaderMap, config: &AppConfig) -> Self {
        if config.dev_bypass_enabled() {
            if let Some(id) = headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value.trim()).ok())
            {
                tracing::debug!(user_id = %id, "session resolved via local bypass");
                return Self::for_user(id);
            }
        }

        let Some(token) = bearer_token(headers).or_else(|| session_cookie(headers)) else {
            return Self::anonymous();
        };

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Supabase sets aud = "authenticated"; the signature is what matters here.
        validation.validate_aud = false;

        match decode::<Claims>(&token, &decoding_key, &validation) {
            Ok(data) => Self {
                user: Some(SessionUser {
                    id: data.claims.sub,
                    email: data.claims.email,
                }),
            },
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    _ => tracing::warn!("rejected session token: {}", e),
                }
                Self::anonymous()
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(Self::resolve(&parts.headers, &config))
    }
}

/// AdminUser
///
/// Extractor for the JSON admin endpoints. Runs the same authentication and
/// authorization steps as the delete workflow but rejects with a JSON error
/// (401 / 403) instead of redirecting.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
    pub profile: Profile,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let session = SessionContext::resolve(&parts.headers, &config);

        match moderation::authorize(repo.as_ref(), &session).await? {
            Authorization::Granted(profile) => Ok(AdminUser {
                id: profile.id,
                profile,
            }),
            Authorization::Anonymous => Err(ApiError::Unauthenticated),
            Authorization::Denied { .. } => Err(ApiError::Forbidden),
        }
    }
}
