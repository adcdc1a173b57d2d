//! `SeaORM` implementation of the `PostService` trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::db::{FeedPost, FeedQuery, NewPost, Post, Store};
use crate::services::post_service::{PostError, PostPatch, PostService};
use crate::services::validation;

pub struct SeaOrmPostService {
    store: Store,
}

impl SeaOrmPostService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PostService for SeaOrmPostService {
    async fn create(
        &self,
        owner_id: i32,
        title: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<Post, PostError> {
        validation::validate_post_title(title)?;
        validation::validate_post_content(content)?;

        let post = self
            .store
            .create_post(NewPost {
                title: title.to_string(),
                content: content.to_string(),
                user_id: owner_id,
                tags,
            })
            .await?;

        info!(post_id = post.id, user_id = owner_id, "Post created");
        Ok(post)
    }

    async fn get(&self, post_id: i32) -> Result<Post, PostError> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or(PostError::NotFound)
    }

    async fn update(&self, mut post: Post) -> Result<Post, PostError> {
        if self.store.update_post_versioned(&mut post).await? {
            return Ok(post);
        }

        // Zero rows matched: tell a deleted post apart from a lost race.
        if self.store.post_exists(post.id).await? {
            debug!(post_id = post.id, version = post.version, "Stale post version");
            Err(PostError::Conflict)
        } else {
            Err(PostError::NotFound)
        }
    }

    async fn patch(&self, post_id: i32, patch: PostPatch) -> Result<Post, PostError> {
        if let Some(title) = &patch.title {
            validation::validate_post_title(title)?;
        }
        if let Some(content) = &patch.content {
            validation::validate_post_content(content)?;
        }

        let mut post = self.get(post_id).await?;

        if let Some(version) = patch.version
            && version != post.version
        {
            return Err(PostError::Conflict);
        }
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }

        self.update(post).await
    }

    async fn delete(&self, post_id: i32) -> Result<(), PostError> {
        if !self.store.delete_post(post_id).await? {
            return Err(PostError::NotFound);
        }
        info!(post_id, "Post deleted");
        Ok(())
    }

    async fn feed(&self, user_id: i32, query: FeedQuery) -> Result<Vec<FeedPost>, PostError> {
        Ok(self.store.get_user_feed(user_id, query).await?)
    }
}
