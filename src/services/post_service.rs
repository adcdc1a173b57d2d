//! Domain service for posts and the feed.

use serde::Deserialize;
use thiserror::Error;

use crate::db::{FeedPost, FeedQuery, Post, StoreError};
use crate::services::validation::ValidationError;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Post not found")]
    NotFound,

    #[error("Post was modified by someone else; reload and retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ValidationError> for PostError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<StoreError> for PostError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Partial update: `None` fields keep their stored value. `version`, when
/// given, is the version the client last saw.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub version: Option<i32>,
}

#[async_trait::async_trait]
pub trait PostService: Send + Sync {
    async fn create(
        &self,
        owner_id: i32,
        title: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<Post, PostError>;

    async fn get(&self, post_id: i32) -> Result<Post, PostError>;

    /// Writes `post` back if the stored version still equals `post.version`.
    /// Returns the post carrying its new version.
    ///
    /// # Errors
    ///
    /// [`PostError::NotFound`] if the post is gone, [`PostError::Conflict`] if
    /// another writer bumped the version first.
    async fn update(&self, post: Post) -> Result<Post, PostError>;

    /// Reads the post, applies `patch` and calls [`PostService::update`].
    async fn patch(&self, post_id: i32, patch: PostPatch) -> Result<Post, PostError>;

    async fn delete(&self, post_id: i32) -> Result<(), PostError>;

    /// Own posts plus posts of followed users, annotated with comment counts.
    async fn feed(&self, user_id: i32, query: FeedQuery) -> Result<Vec<FeedPost>, PostError>;
}
