use serde::{Deserialize, Serialize};

use crate::common::error::Result;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrawlerConfig {
    /// Default maximum crawl depth for ad-hoc/site crawls that omit it
    pub default_max_depth: i64,

    /// Default maximum pages per run
    pub default_max_pages: i64,

    /// User agent string sent by the default Fetcher
    pub user_agent: String,

    /// Delay between fetches within a single crawl, in milliseconds
    pub crawl_delay_ms: u64,

    /// Hint for how many crawls the Supervisor may run concurrently
    pub concurrency_hint: usize,

    /// Scheduler tick interval, in minutes
    pub scheduler_tick_minutes: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Path to the local SQLite database file
    pub database_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Base URL of the full-text search backend
    pub url: String,

    /// API key for the search backend, empty if unauthenticated
    pub api_key: String,

    /// Name of the index holding crawled pages
    pub index_name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// API server bind host
    pub host: String,

    /// API server bind port
    pub port: u16,

    /// Enable permissive CORS
    pub enable_cors: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Shared bearer token; empty means all endpoints are open (dev mode)
    pub bearer_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            crawler: CrawlerConfig {
                default_max_depth: 3,
                default_max_pages: 100,
                user_agent: "site-crawl-search/0.1".to_string(),
                crawl_delay_ms: 500,
                concurrency_hint: 4,
                scheduler_tick_minutes: 5,
            },
            storage: StorageConfig {
                database_path: "./data/search-service.db".to_string(),
            },
            index: IndexConfig {
                url: "http://localhost:7700".to_string(),
                api_key: String::new(),
                index_name: "web_pages".to_string(),
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                enable_cors: true,
            },
            auth: AuthConfig {
                bearer_token: String::new(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a `.env` file (if present) and environment
    /// variables, falling back to defaults for anything unset.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let layered = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .build()?;
        let mut cfg: Config = layered
            .try_deserialize()
            .unwrap_or_else(|_| Config::default());

        if let Ok(v) = std::env::var("CRAWL_DEFAULT_MAX_DEPTH") {
            cfg.crawler.default_max_depth = v.parse().unwrap_or(cfg.crawler.default_max_depth);
        }
        if let Ok(v) = std::env::var("CRAWL_DEFAULT_MAX_PAGES") {
            cfg.crawler.default_max_pages = v.parse().unwrap_or(cfg.crawler.default_max_pages);
        }
        if let Ok(v) = std::env::var("CRAWL_USER_AGENT") {
            cfg.crawler.user_agent = v;
        }
        if let Ok(v) = std::env::var("CRAWL_DELAY_MS") {
            cfg.crawler.crawl_delay_ms = v.parse().unwrap_or(cfg.crawler.crawl_delay_ms);
        }
        if let Ok(v) = std::env::var("CRAWL_CONCURRENCY_HINT") {
            cfg.crawler.concurrency_hint = v.parse().unwrap_or(cfg.crawler.concurrency_hint);
        }
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            cfg.storage.database_path = v;
        }
        if let Ok(v) = std::env::var("MEILISEARCH_URL") {
            cfg.index.url = v;
        }
        if let Ok(v) = std::env::var("MEILISEARCH_API_KEY") {
            cfg.index.api_key = v;
        }
        if let Ok(v) = std::env::var("CRAWL_INDEX_NAME") {
            cfg.index.index_name = v;
        }
        if let Ok(v) = std::env::var("API_HOST") {
            cfg.api.host = v;
        }
        if let Ok(v) = std::env::var("API_PORT") {
            cfg.api.port = v.parse().unwrap_or(cfg.api.port);
        }
        if let Ok(v) = std::env::var("API_BEARER_TOKEN") {
            cfg.auth.bearer_token = v;
        }

        Ok(cfg)
    }
}
