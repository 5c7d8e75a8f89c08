//! Site-scoped web crawl and search-index service.
//!
//! Given an administrator-defined set of sites (domain + seed URL +
//! traversal limits), periodically performs bounded breadth-first
//! crawls, extracts textual content per page, and maintains a
//! deduplicated full-text index keyed by URL.

pub mod api;
pub mod common;
pub mod crawler;
pub mod index;
pub mod model;
pub mod scheduler;
pub mod store;
pub mod supervisor;

pub use common::{Config, Error, Result};

/// Re-exports for binaries and integration tests.
pub mod prelude {
    pub use crate::common::{Config, Error, Result};
    pub use crate::crawler::{CrawlEngine, FetchOutcome, Fetcher, HttpFetcher, RunArgs};
    pub use crate::index::{IndexGateway, MeiliIndexGateway};
    pub use crate::model::{Document, Site, SiteCreate, SitePatch, Task, TaskStatus};
    pub use crate::scheduler::Scheduler;
    pub use crate::store::Store;
    pub use crate::supervisor::Supervisor;
}
