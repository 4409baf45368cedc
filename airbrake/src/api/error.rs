use std::fmt;
use thiserror::Error;

/// Key used to resolve a project from the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKey {
    Name(String),
    Id(u64),
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKey::Name(name) => write!(f, "name '{}'", name),
            ProjectKey::Id(id) => write!(f, "id {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request URL is stripped since its query carries the credential
    #[error("HTTP request failed: {0}")]
    Transport(reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    #[error("Unexpected response from {context}: {detail}")]
    MalformedResponse { context: String, detail: String },

    #[error("Airbrake returned HTTP {status} during {operation}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Can't find project with {0}")]
    NotFound(ProjectKey),

    #[error("Project '{name}' has no identifier yet")]
    MissingIdentifier { name: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.without_url())
    }
}

impl ApiError {
    pub(crate) fn malformed(context: impl Into<String>, detail: impl fmt::Display) -> Self {
        ApiError::MalformedResponse {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    /// True when the remote was never reached or the request could not be built
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::InvalidUrl(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Remote status for errors that carry one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
