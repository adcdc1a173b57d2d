use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};

use crate::db::{StoreError, now_timestamp};
use crate::entities::followers;

pub struct FollowerRepository {
    conn: DatabaseConnection,
}

impl FollowerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts the edge; an existing edge is left untouched.
    pub async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<(), StoreError> {
        let now = now_timestamp();

        let edge = followers::ActiveModel {
            follower_id: Set(follower_id),
            followed_id: Set(followed_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        followers::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([followers::Column::FollowerId, followers::Column::FollowedId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    /// Returns the number of edges removed (0 or 1).
    pub async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<u64, StoreError> {
        let result = followers::Entity::delete_many()
            .filter(followers::Column::FollowerId.eq(follower_id))
            .filter(followers::Column::FollowedId.eq(followed_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
