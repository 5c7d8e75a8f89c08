use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One execution of a crawl, producing a set of indexed documents and
/// a final status.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: String,
    pub site_id: Option<String>,
    pub start_url: String,
    pub max_depth: i64,
    pub max_pages: i64,
    pub same_domain_only: bool,
    pub status: String,
    pub progress: i64,
    pub total_pages: i64,
    pub success_pages: i64,
    pub failed_pages: i64,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Fields writable via `Store::patch_task` — a strict subset of
/// `Task`'s columns; `id`, `site_id`, and the creation-time snapshot
/// fields are append-once.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub progress: Option<i64>,
    pub total_pages: Option<i64>,
    pub success_pages: Option<i64>,
    pub failed_pages: Option<i64>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// `POST /crawl` and `POST /crawl/tasks` list response item.
#[derive(Debug, Clone, Serialize)]
pub struct TaskList {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
