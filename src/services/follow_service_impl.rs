//! `SeaORM` implementation of the `FollowService` trait.

use async_trait::async_trait;
use tracing::debug;

use crate::db::Store;
use crate::services::follow_service::{FollowError, FollowService};

pub struct SeaOrmFollowService {
    store: Store,
}

impl SeaOrmFollowService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FollowService for SeaOrmFollowService {
    async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<(), FollowError> {
        if follower_id == followed_id {
            return Err(FollowError::SelfFollow);
        }

        if !self.store.user_exists(followed_id).await? {
            return Err(FollowError::UserNotFound);
        }

        self.store.follow(follower_id, followed_id).await?;
        debug!(follower_id, followed_id, "Follow edge written");
        Ok(())
    }

    async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<(), FollowError> {
        if !self.store.user_exists(followed_id).await? {
            return Err(FollowError::UserNotFound);
        }

        let removed = self.store.unfollow(follower_id, followed_id).await?;
        debug!(follower_id, followed_id, removed, "Follow edge removed");
        Ok(())
    }
}
