use crate::error::BackendError;
use crate::models::{BlogPost, ContentKind, NewsletterIssue, Profile, Project};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Repository Trait
///
/// The table-oriented contract this service needs from the hosted backend:
/// ordered selects, a profile lookup for authorization and a delete by id.
/// Handlers only ever see `Arc<dyn Repository>`, so tests swap in the
/// in-memory implementation below.
///
/// Every method returns `Result`; backend failures are never turned into empty
/// lists or `false`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Admin Listings (newest first) ---
    async fn list_blogs(&self) -> Result<Vec<BlogPost>, BackendError>;
    async fn list_projects(&self) -> Result<Vec<Project>, BackendError>;

    // --- Diagnostics ---
    async fn count_blogs(&self) -> Result<i64, BackendError>;
    async fn recent_blogs(&self, limit: i64) -> Result<Vec<BlogPost>, BackendError>;
    async fn list_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError>;
    // Issues an anonymous reader can see: published and flagged public.
    async fn list_public_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError>;

    // --- Authorization ---
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError>;

    // --- Mutation ---
    /// Deletes the row with the given id. No existence check; returns the
    /// number of rows removed (0 or 1).
    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<u64, BackendError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const BLOG_COLUMNS: &str =
    "id, title, slug, excerpt, content, status, tags, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, title, description, status, tech_stack, repo_url, live_url, image_url, created_at, updated_at";
const NEWSLETTER_COLUMNS: &str = "id, subject, status, is_public, published_at, created_at";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres instance.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_blogs(&self) -> Result<Vec<BlogPost>, BackendError> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM blogs ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, BlogPost>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("list_blogs error: {:?}", e);
                BackendError::from(e)
            })
    }

    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        let sql =
            format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("list_projects error: {:?}", e);
                BackendError::from(e)
            })
    }

    async fn count_blogs(&self) -> Result<i64, BackendError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blogs")
            .fetch_one(&self.pool)
            .await
            .map_err(BackendError::from)
    }

    async fn recent_blogs(&self, limit: i64) -> Result<Vec<BlogPost>, BackendError> {
        let sql = format!(
            "SELECT {BLOG_COLUMNS} FROM blogs ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(BackendError::from)
    }

    async fn list_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError> {
        let sql = format!("SELECT {NEWSLETTER_COLUMNS} FROM newsletters ORDER BY created_at DESC");
        sqlx::query_as::<_, NewsletterIssue>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(BackendError::from)
    }

    async fn list_public_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError> {
        let sql = format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters \
             WHERE status = 'published' AND is_public = true \
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, NewsletterIssue>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(BackendError::from)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, COALESCE(is_admin, false) AS is_admin FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_profile error: {:?}", e);
            BackendError::from(e)
        })
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<u64, BackendError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        match sqlx::query(&sql).bind(id).execute(&self.pool).await {
            Ok(res) => Ok(res.rows_affected()),
            Err(e) => {
                tracing::error!("delete {} error: {:?}", kind.label(), e);
                Err(BackendError::from(e))
            }
        }
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in memory. Used by the test suite and for
/// running the router without a database. Ordering matches the Postgres
/// queries (created_at DESC, id DESC).
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<MemoryTables>,
    /// When set, every call fails with this error.
    failure: Option<BackendError>,
    /// When set, only deletes fail with this error.
    delete_failure: Option<BackendError>,
}

#[derive(Default)]
struct MemoryTables {
    profiles: Vec<Profile>,
    blogs: Vec<BlogPost>,
    projects: Vec<Project>,
    newsletters: Vec<NewsletterIssue>,
    delete_calls: usize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every call fails, for exercising error paths.
    pub fn failing(error: BackendError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Reads and authorization succeed; every delete fails with `error`.
    pub fn failing_deletes(error: BackendError) -> Self {
        Self {
            delete_failure: Some(error),
            ..Self::default()
        }
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.tables().profiles.push(profile);
        self
    }

    pub fn with_blog(self, post: BlogPost) -> Self {
        self.tables().blogs.push(post);
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        self.tables().projects.push(project);
        self
    }

    pub fn with_newsletter(self, issue: NewsletterIssue) -> Self {
        self.tables().newsletters.push(issue);
        self
    }

    /// Number of delete calls that reached the backend, successful or not.
    pub fn delete_calls(&self) -> usize {
        self.tables().delete_calls
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, MemoryTables> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn newest_first<T, K>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T>
where
    K: Ord,
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_blogs(&self) -> Result<Vec<BlogPost>, BackendError> {
        self.check()?;
        let rows = self.tables().blogs.clone();
        Ok(newest_first(rows, |b| (b.created_at, b.id)))
    }

    async fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        self.check()?;
        let rows = self.tables().projects.clone();
        Ok(newest_first(rows, |p| (p.created_at, p.id)))
    }

    async fn count_blogs(&self) -> Result<i64, BackendError> {
        self.check()?;
        Ok(self.tables().blogs.len() as i64)
    }

    async fn recent_blogs(&self, limit: i64) -> Result<Vec<BlogPost>, BackendError> {
        let mut rows = self.list_blogs().await?;
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn list_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError> {
        self.check()?;
        let rows = self.tables().newsletters.clone();
        Ok(newest_first(rows, |n| n.created_at))
    }

    async fn list_public_newsletters(&self) -> Result<Vec<NewsletterIssue>, BackendError> {
        let rows = self.list_newsletters().await?;
        Ok(rows
            .into_iter()
            .filter(NewsletterIssue::is_publicly_visible)
            .collect())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        self.check()?;
        Ok(self.tables().profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn delete_content(&self, kind: ContentKind, id: Uuid) -> Result<u64, BackendError> {
        let mut tables = self.tables();
        tables.delete_calls += 1;
        self.check()?;
        if let Some(err) = &self.delete_failure {
            return Err(err.clone());
        }
        let removed = match kind {
            ContentKind::Blog => {
                let before = tables.blogs.len();
                tables.blogs.retain(|b| b.id != id);
                before - tables.blogs.len()
            }
            ContentKind::Project => {
                let before = tables.projects.len();
                tables.projects.retain(|p| p.id != id);
                before - tables.projects.len()
            }
        };
        Ok(removed as u64)
    }
}
