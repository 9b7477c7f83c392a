use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS,
    /// timeout) or the body could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-success status code.
    #[error("{1} (status {0})")]
    Status(reqwest::StatusCode, String),
    /// An analytics envelope came back with `success: false`.
    #[error("rejected by backend: {0}")]
    Rejected(String),
    /// The response parsed but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),
    /// The owning scope was cancelled before the response arrived.
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Status(code, _) => Some(*code),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A failed part of an aggregated load whose siblings still succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub part: &'static str,
    pub message: String,
}

impl LoadIssue {
    pub fn new(part: &'static str, error: &ApiError) -> Self {
        Self {
            part,
            message: error.to_string(),
        }
    }
}

/// Keep the value of a settled sub-request, or record why it is missing.
pub(crate) fn settle<T>(
    part: &'static str,
    result: ApiResult<T>,
    issues: &mut Vec<LoadIssue>,
) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
        Err(err) => {
            tracing::warn!(part, error = %err, "partial load failure");
            issues.push(LoadIssue::new(part, &err));
            Ok(None)
        }
    }
}
