pub mod config;
pub mod error;
pub mod normalize;

pub use config::Config;
pub use error::{Error, Result};
