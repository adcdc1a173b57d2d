//! `SeaORM` implementation of the `CommentService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{Comment, CommentWithAuthor, Store};
use crate::services::comment_service::{CommentError, CommentService};
use crate::services::validation;

pub struct SeaOrmCommentService {
    store: Store,
}

impl SeaOrmCommentService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommentService for SeaOrmCommentService {
    async fn create(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, CommentError> {
        validation::validate_comment_content(content)?;

        if !self.store.post_exists(post_id).await? {
            return Err(CommentError::PostNotFound);
        }

        let comment = self.store.create_comment(post_id, user_id, content).await?;
        info!(comment_id = comment.id, post_id, user_id, "Comment created");
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentWithAuthor>, CommentError> {
        Ok(self.store.list_comments(post_id).await?)
    }
}
