/// Errors raised by the feed engine and its SQLite port.
///
/// Every operation either applies completely or returns one of these
/// without touching state.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("Sign in to continue")]
    Unauthenticated,

    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl FeedError {
    pub fn post_not_found(id: &str) -> Self {
        FeedError::NotFound {
            entity: "Post",
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: &str) -> Self {
        FeedError::NotFound {
            entity: "User",
            id: id.to_string(),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
