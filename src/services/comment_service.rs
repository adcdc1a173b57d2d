//! Domain service for comments.

use thiserror::Error;

use crate::db::{Comment, CommentWithAuthor, StoreError};
use crate::services::validation::ValidationError;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Post not found")]
    PostNotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ValidationError> for CommentError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<StoreError> for CommentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ForeignKeyViolation => Self::PostNotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait CommentService: Send + Sync {
    async fn create(&self, post_id: i32, user_id: i32, content: &str)
    -> Result<Comment, CommentError>;

    /// Comments on a post with the author's username, oldest first.
    async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentWithAuthor>, CommentError>;
}
