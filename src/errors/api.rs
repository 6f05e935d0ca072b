use thiserror::Error;

// Errors raised while talking to the research backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Task not found")]
    NotFound { message: Option<String> },

    #[error("Server returned HTTP {status}")]
    Rejected { status: u16, message: Option<String> },

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    // Message supplied by the server in an `{ "error": ... }` body, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { message } | ApiError::Rejected { message, .. } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
