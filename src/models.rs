use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Backend Rows ---

/// Profile
///
/// One row of `public.profiles` per authenticated user. The `is_admin` flag is
/// the only authorization signal this service reads; it is maintained by hand
/// in the backend and never written here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub is_admin: bool,
}

/// BlogPost
///
/// A row of `public.blogs`. Authored in the site's editor, deleted through the
/// moderation workflow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    // 'draft' | 'published'
    pub status: String,
    #[sqlx(default)]
    pub tags: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Project
///
/// A portfolio entry from `public.projects`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    #[sqlx(default)]
    pub tech_stack: Vec<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub image_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// NewsletterIssue
///
/// A row of `public.newsletters`. Visibility is the conjunction of the
/// publication status and the `is_public` flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct NewsletterIssue {
    pub id: Uuid,
    pub subject: String,
    pub status: String,
    pub is_public: bool,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl NewsletterIssue {
    /// Whether anonymous readers can see this issue.
    pub fn is_publicly_visible(&self) -> bool {
        self.status == "published" && self.is_public
    }
}

/// ContentKind
///
/// The two content tables the admin surface manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Blog,
    Project,
}

impl ContentKind {
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Blog => "blogs",
            ContentKind::Project => "projects",
        }
    }

    /// Admin listing page the workflow returns to after a delete.
    pub fn listing_path(&self) -> &'static str {
        match self {
            ContentKind::Blog => "/admin/blogs",
            ContentKind::Project => "/admin/projects",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::Project => "project",
        }
    }
}

// --- Webhook Payloads ---

/// ChangeEvent
///
/// Body of the database webhook fired on inserts into `public.messages`.
/// Only `record` is required; the other envelope fields are logged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    pub record: MessageRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct MessageRecord {
    pub content: String,
    pub sender_id: String,
    pub created_at: String,
}

// --- Responses ---

/// ErrorBody
///
/// The only error shape the API emits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BlogListResponse {
    pub blogs: Vec<BlogPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

/// HealthResponse
///
/// `env` maps each recognised variable to whether it is set. Values are never
/// included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub env: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnvReport {
    pub message: String,
    pub mode: String,
    pub env: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BlogSample {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&BlogPost> for BlogSample {
    fn from(post: &BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            status: post.status.clone(),
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogProbeResponse {
    pub ok: bool,
    pub count: usize,
    pub sample: Vec<BlogSample>,
}

/// NewsletterDiagnostics
///
/// Side-by-side view of every issue and the publicly visible subset, used to
/// track down issues that were published but never made public (or vice
/// versa).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewsletterDiagnostics {
    pub all_count: usize,
    pub public_count: usize,
    pub hidden_count: usize,
    pub all: Vec<NewsletterIssue>,
    pub public: Vec<NewsletterIssue>,
    pub hidden_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationSent {
    pub sent: bool,
    pub id: Option<String>,
}
