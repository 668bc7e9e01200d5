use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("scope not found: {0}")]
    ScopeNotFound(String),
    #[error("failed to read {path}: {reason}")]
    ContentRead { path: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("document source unavailable: {0}")]
    SourceUnavailable(String),
}

impl ExplorerError {
    pub fn content_read(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ContentRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
