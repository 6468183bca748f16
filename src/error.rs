//! Error types for each layer of the application.
//!
//! Store, auth, repository and summarization failures each get their own
//! enum. `ApiError` turns any of them into a JSON `{"error": ...}` response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Note store is not configured")]
    NotConfigured,

    #[error("Note not found")]
    NotFound,

    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Malformed store data: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth service is not configured")]
    NotConfigured,

    #[error("{0}")]
    Rejected(String),

    #[error("Too many login attempts, try again later")]
    RateLimited,

    #[error("{0} is not supported by this auth backend")]
    Unsupported(String),

    #[error("Auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Auth error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required to create notes")]
    AuthRequired,

    #[error("Error creating note: {0}")]
    Create(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepoError {
    pub fn status(&self) -> StatusCode {
        match self {
            RepoError::Validation(_) => StatusCode::BAD_REQUEST,
            RepoError::AuthRequired => StatusCode::UNAUTHORIZED,
            RepoError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            RepoError::Create(_) | RepoError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Text content is required")]
    EmptyText,

    #[error("Summarization API key is not configured")]
    NotConfigured,

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed summarization response: {0}")]
    MalformedResponse(String),

    #[error("No summary was generated")]
    EmptySummary,
}

impl SummarizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            SummarizeError::EmptyText => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// HTTP mapping
// ============================================================================

/// An error ready to be sent as `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        Self::new(err.status(), err.to_string())
    }
}

impl From<SummarizeError> for ApiError {
    fn from(err: SummarizeError) -> Self {
        Self::new(err.status(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
