use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An admin-configured crawl target identified by a domain.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    pub id: String,
    pub domain: String,
    pub name: Option<String>,
    pub start_url: String,
    pub max_depth: i64,
    pub max_pages: i64,
    pub same_domain_only: bool,
    pub crawl_frequency_minutes: i64,
    pub enabled: bool,
    pub last_crawl_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /sites` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteCreate {
    pub domain: String,
    pub name: Option<String>,
    pub start_url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    #[serde(default = "default_max_pages")]
    pub max_pages: i64,
    #[serde(default = "default_true")]
    pub same_domain_only: bool,
    #[serde(default = "default_frequency")]
    pub crawl_frequency_minutes: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// `PUT /sites/{id}` request body — all fields optional (partial update).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitePatch {
    pub name: Option<String>,
    pub start_url: Option<String>,
    pub max_depth: Option<i64>,
    pub max_pages: Option<i64>,
    pub same_domain_only: Option<bool>,
    pub crawl_frequency_minutes: Option<i64>,
    pub enabled: Option<bool>,
}

fn default_max_depth() -> i64 {
    3
}

fn default_max_pages() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_frequency() -> i64 {
    1440
}
