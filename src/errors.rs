use crate::filter::{FilterParseError, SortParseError};
use crate::ingest::repository::RepositoryError;
use astra::Response;
use thiserror::Error;

/// Errors originating from either the server logic
/// (routing, query parameters, missing resources) or downstream layers (DB).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Filter(#[from] FilterParseError),
    #[error("invalid sort: {0}")]
    Sort(#[from] SortParseError),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Internal Server Error")]
    InternalError,
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl From<rusqlite::Error> for ServerError {
    fn from(err: rusqlite::Error) -> Self {
        ServerError::DbError(err.to_string())
    }
}

impl From<RepositoryError> for ServerError {
    fn from(err: RepositoryError) -> Self {
        ServerError::DbError(err.to_string())
    }
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) | ServerError::Filter(_) | ServerError::Sort(_) => 400,
            ServerError::DbError(_) | ServerError::InternalError => 500,
        }
    }

    /// Byte offset into the filter string, when the error points at one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ServerError::Filter(e) => e.offset,
            _ => None,
        }
    }
}
