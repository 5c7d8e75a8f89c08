use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("HTML parsing error: {0}")]
    HtmlParseError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("index backend unavailable: {0}")]
    IndexUnavailable(String),

    #[error("fetch error: {0}")]
    FetchError(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("unexpected error: {0}")]
    Fatal(String),
}

impl Error {
    /// Truncate the display form of this error to at most `len` chars,
    /// for storage in `crawl_tasks.error_message`.
    pub fn truncated(&self, len: usize) -> String {
        let s = self.to_string();
        if s.chars().count() <= len {
            s
        } else {
            s.chars().take(len).collect()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
