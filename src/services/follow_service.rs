//! Domain service for the follow graph.

use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("User not found")]
    UserNotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for FollowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ForeignKeyViolation => Self::UserNotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait FollowService: Send + Sync {
    /// Adds the edge `follower_id -> followed_id`. Following someone twice is
    /// a no-op.
    async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<(), FollowError>;

    /// Removes the edge. Removing a missing edge is not an error.
    async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<(), FollowError>;
}
