pub mod engine;
pub mod fetcher;
pub mod frontier;
pub mod parser;

pub use engine::{CrawlEngine, RunArgs};
pub use fetcher::{FetchOutcome, Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use parser::{ParsedPage, Parser};
