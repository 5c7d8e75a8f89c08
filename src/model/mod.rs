pub mod document;
pub mod site;
pub mod task;

pub use document::{Document, SearchHit, SearchResponse};
pub use site::{Site, SiteCreate, SitePatch};
pub use task::{Task, TaskPatch, TaskStatus};
