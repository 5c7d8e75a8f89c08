//! Durable key/value store for `Site` and `Task` records, backed by a
//! local SQLite file. Single-writer-per-record semantics are enforced
//! by callers (see the Supervisor), not by the Store itself.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use uuid::Uuid;

use crate::common::error::{Error, Result};
use crate::model::site::{Site, SiteCreate, SitePatch};
use crate::model::task::{Task, TaskPatch, TaskStatus};

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS crawl_sites (
    id          TEXT PRIMARY KEY,
    domain      TEXT NOT NULL UNIQUE,
    name        TEXT,
    start_url   TEXT NOT NULL,
    max_depth   INTEGER NOT NULL DEFAULT 3,
    max_pages   INTEGER NOT NULL DEFAULT 100,
    same_domain_only INTEGER NOT NULL DEFAULT 1,
    crawl_frequency_minutes INTEGER NOT NULL DEFAULT 1440,
    enabled     INTEGER NOT NULL DEFAULT 1,
    last_crawl_at TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_tasks (
    id            TEXT PRIMARY KEY,
    site_id       TEXT,
    start_url     TEXT NOT NULL,
    max_depth     INTEGER NOT NULL DEFAULT 3,
    max_pages     INTEGER NOT NULL DEFAULT 100,
    same_domain_only INTEGER NOT NULL DEFAULT 1,
    status        TEXT NOT NULL DEFAULT 'pending',
    progress      INTEGER NOT NULL DEFAULT 0,
    total_pages   INTEGER NOT NULL DEFAULT 0,
    success_pages INTEGER NOT NULL DEFAULT 0,
    failed_pages  INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    started_at    TEXT,
    finished_at   TEXT,
    created_at    TEXT NOT NULL,
    FOREIGN KEY (site_id) REFERENCES crawl_sites(id) ON DELETE SET NULL
);
"#;

#[derive(Debug, Clone, Default)]
pub struct SiteFilter {
    pub enabled: Option<bool>,
}

/// Durable store for sites and tasks.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if necessary) the SQLite file at `db_path` and
    /// ensure both tables exist.
    pub async fn init(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let url = format!("sqlite://{db_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await?;
        sqlx::query(CREATE_TABLES_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn init_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query(CREATE_TABLES_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    // ── Sites ────────────────────────────────────────────────

    pub async fn create_site(&self, attrs: SiteCreate) -> Result<Site> {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM crawl_sites WHERE domain = ?")
            .bind(attrs.domain.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(Error::Conflict(format!("domain already registered: {}", attrs.domain)));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let domain = attrs.domain.to_lowercase();

        sqlx::query(
            "INSERT INTO crawl_sites
             (id, domain, name, start_url, max_depth, max_pages, same_domain_only,
              crawl_frequency_minutes, enabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&domain)
        .bind(&attrs.name)
        .bind(&attrs.start_url)
        .bind(attrs.max_depth)
        .bind(attrs.max_pages)
        .bind(attrs.same_domain_only)
        .bind(attrs.crawl_frequency_minutes)
        .bind(attrs.enabled)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_site(&id).await
    }

    pub async fn get_site(&self, id: &str) -> Result<Site> {
        sqlx::query_as::<_, Site>("SELECT * FROM crawl_sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("site not found: {id}")))
    }

    pub async fn update_site(&self, id: &str, patch: SitePatch) -> Result<Site> {
        let _ = self.get_site(id).await?;

        let mut sets: Vec<&str> = Vec::new();
        if patch.name.is_some() {
            sets.push("name = ?");
        }
        if patch.start_url.is_some() {
            sets.push("start_url = ?");
        }
        if patch.max_depth.is_some() {
            sets.push("max_depth = ?");
        }
        if patch.max_pages.is_some() {
            sets.push("max_pages = ?");
        }
        if patch.same_domain_only.is_some() {
            sets.push("same_domain_only = ?");
        }
        if patch.crawl_frequency_minutes.is_some() {
            sets.push("crawl_frequency_minutes = ?");
        }
        if patch.enabled.is_some() {
            sets.push("enabled = ?");
        }

        if !sets.is_empty() {
            sets.push("updated_at = ?");
            let sql = format!("UPDATE crawl_sites SET {} WHERE id = ?", sets.join(", "));
            let mut q = sqlx::query(&sql);
            if let Some(v) = &patch.name {
                q = q.bind(v);
            }
            if let Some(v) = &patch.start_url {
                q = q.bind(v);
            }
            if let Some(v) = patch.max_depth {
                q = q.bind(v);
            }
            if let Some(v) = patch.max_pages {
                q = q.bind(v);
            }
            if let Some(v) = patch.same_domain_only {
                q = q.bind(v);
            }
            if let Some(v) = patch.crawl_frequency_minutes {
                q = q.bind(v);
            }
            if let Some(v) = patch.enabled {
                q = q.bind(v);
            }
            q = q.bind(Utc::now()).bind(id);
            q.execute(&self.pool).await?;
        }

        self.get_site(id).await
    }

    pub async fn delete_site(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM crawl_sites WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("site not found: {id}")));
        }
        Ok(())
    }

    pub async fn list_sites(&self, filter: SiteFilter) -> Result<Vec<Site>> {
        let rows = match filter.enabled {
            Some(enabled) => {
                sqlx::query_as::<_, Site>(
                    "SELECT * FROM crawl_sites WHERE enabled = ? ORDER BY created_at DESC",
                )
                .bind(enabled)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Site>("SELECT * FROM crawl_sites ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn touch_site_last_crawl(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE crawl_sites SET last_crawl_at = ?, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────

    pub async fn create_task(
        &self,
        site_id: Option<String>,
        start_url: String,
        max_depth: i64,
        max_pages: i64,
        same_domain_only: bool,
    ) -> Result<Task> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO crawl_tasks
             (id, site_id, start_url, max_depth, max_pages, same_domain_only, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)",
        )
        .bind(&id)
        .bind(&site_id)
        .bind(&start_url)
        .bind(max_depth)
        .bind(max_pages)
        .bind(same_domain_only)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_task(&id).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        sqlx::query_as::<_, Task>("SELECT * FROM crawl_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task not found: {id}")))
    }

    pub async fn list_tasks(&self, page: i64, page_size: i64) -> Result<(Vec<Task>, i64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) * page_size;

        let items = sqlx::query_as::<_, Task>(
            "SELECT * FROM crawl_tasks ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS c FROM crawl_tasks")
            .fetch_one(&self.pool)
            .await?
            .try_get("c")?;

        Ok((items, total))
    }

    /// Patch only the writable fields of a task (spec.md §4.1).
    pub async fn patch_task(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let mut sets: Vec<&str> = Vec::new();
        if patch.status.is_some() {
            sets.push("status = ?");
        }
        if patch.progress.is_some() {
            sets.push("progress = ?");
        }
        if patch.total_pages.is_some() {
            sets.push("total_pages = ?");
        }
        if patch.success_pages.is_some() {
            sets.push("success_pages = ?");
        }
        if patch.failed_pages.is_some() {
            sets.push("failed_pages = ?");
        }
        if patch.error_message.is_some() {
            sets.push("error_message = ?");
        }
        if patch.started_at.is_some() {
            sets.push("started_at = ?");
        }
        if patch.finished_at.is_some() {
            sets.push("finished_at = ?");
        }

        if sets.is_empty() {
            return self.get_task(id).await;
        }

        let sql = format!("UPDATE crawl_tasks SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&sql);
        if let Some(v) = patch.status {
            q = q.bind(v.to_string());
        }
        if let Some(v) = patch.progress {
            q = q.bind(v);
        }
        if let Some(v) = patch.total_pages {
            q = q.bind(v);
        }
        if let Some(v) = patch.success_pages {
            q = q.bind(v);
        }
        if let Some(v) = patch.failed_pages {
            q = q.bind(v);
        }
        if let Some(v) = &patch.error_message {
            q = q.bind(v.chars().take(2000).collect::<String>());
        }
        if let Some(v) = patch.started_at {
            q = q.bind(v);
        }
        if let Some(v) = patch.finished_at {
            q = q.bind(v);
        }
        q = q.bind(id);
        q.execute(&self.pool).await?;

        self.get_task(id).await
    }

    /// Sweep any task left in `running` state to `failed`. Called once
    /// at startup: restart-orphaned tasks are never auto-resumed
    /// (spec.md §4.5).
    pub async fn sweep_orphaned_tasks(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE crawl_tasks SET status = 'failed',
             error_message = 'orphaned at process restart',
             finished_at = ?
             WHERE status = 'running'",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::site::SiteCreate;

    fn sample_site(domain: &str) -> SiteCreate {
        SiteCreate {
            domain: domain.to_string(),
            name: Some("Example".to_string()),
            start_url: format!("https://{domain}/"),
            max_depth: 3,
            max_pages: 100,
            same_domain_only: true,
            crawl_frequency_minutes: 60,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn create_and_get_site_roundtrips() {
        let store = Store::init_in_memory().await.unwrap();
        let site = store.create_site(sample_site("Example.com")).await.unwrap();
        assert_eq!(site.domain, "example.com");
        let fetched = store.get_site(&site.id).await.unwrap();
        assert_eq!(fetched.id, site.id);
    }

    #[tokio::test]
    async fn duplicate_domain_is_conflict() {
        let store = Store::init_in_memory().await.unwrap();
        store.create_site(sample_site("example.com")).await.unwrap();
        let err = store.create_site(sample_site("example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn update_site_is_partial() {
        let store = Store::init_in_memory().await.unwrap();
        let site = store.create_site(sample_site("example.com")).await.unwrap();
        let patched = store
            .update_site(
                &site.id,
                SitePatch {
                    max_pages: Some(500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.max_pages, 500);
        assert_eq!(patched.name, site.name);
    }

    #[tokio::test]
    async fn delete_site_does_not_cascade_tasks() {
        let store = Store::init_in_memory().await.unwrap();
        let site = store.create_site(sample_site("example.com")).await.unwrap();
        let task = store
            .create_task(Some(site.id.clone()), site.start_url.clone(), 3, 100, true)
            .await
            .unwrap();
        store.delete_site(&site.id).await.unwrap();
        let fetched = store.get_task(&task.id).await.unwrap();
        assert_eq!(fetched.site_id.as_deref(), Some(site.id.as_str()));
    }

    #[tokio::test]
    async fn patch_task_only_touches_writable_fields() {
        let store = Store::init_in_memory().await.unwrap();
        let task = store
            .create_task(None, "https://example.com".into(), 3, 100, true)
            .await
            .unwrap();
        let patched = store
            .patch_task(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Running),
                    progress: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.status, "running");
        assert_eq!(patched.progress, 10);
        assert_eq!(patched.start_url, task.start_url);
    }

    #[tokio::test]
    async fn sweep_orphaned_tasks_marks_running_as_failed() {
        let store = Store::init_in_memory().await.unwrap();
        let task = store
            .create_task(None, "https://example.com".into(), 3, 100, true)
            .await
            .unwrap();
        store
            .patch_task(&task.id, TaskPatch { status: Some(TaskStatus::Running), ..Default::default() })
            .await
            .unwrap();
        let affected = store.sweep_orphaned_tasks().await.unwrap();
        assert_eq!(affected, 1);
        let fetched = store.get_task(&task.id).await.unwrap();
        assert_eq!(fetched.status, "failed");
    }

    #[tokio::test]
    async fn init_creates_file_backed_database_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("service.db");
        let store = Store::init(db_path.to_str().unwrap()).await.unwrap();

        let site = store.create_site(sample_site("example.com")).await.unwrap();
        assert!(db_path.exists());

        let fetched = store.get_site(&site.id).await.unwrap();
        assert_eq!(fetched.domain, "example.com");
    }
}
