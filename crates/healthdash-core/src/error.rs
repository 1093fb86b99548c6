//! Error taxonomy shared by the loading and aggregation pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },
    #[error("Schema mismatch ({location}): {detail}")]
    SchemaMismatch { location: String, detail: String },
    #[error("No data: {0}")]
    EmptyResult(String),
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl Error {
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(location: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            location: location.into(),
            detail: detail.into(),
        }
    }

    /// True for results that should render as "no data" rather than fail
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::EmptyResult(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
