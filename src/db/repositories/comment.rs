use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;

use crate::db::{StoreError, now_timestamp};
use crate::entities::{comments, users};

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: String,
}

impl From<comments::Model> for Comment {
    fn from(model: comments::Model) -> Self {
        Self {
            id: model.id,
            post_id: model.post_id,
            user_id: model.user_id,
            content: model.content,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromQueryResult)]
pub struct CommentWithAuthor {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: String,
    pub username: String,
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let model = comments::ActiveModel {
            post_id: Set(post_id),
            user_id: Set(user_id),
            content: Set(content.to_string()),
            created_at: Set(now_timestamp()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Comment::from(model))
    }

    pub async fn list_for_post(&self, post_id: i32) -> Result<Vec<CommentWithAuthor>, StoreError> {
        let rows = comments::Entity::find()
            .select_only()
            .columns([
                comments::Column::Id,
                comments::Column::PostId,
                comments::Column::UserId,
                comments::Column::Content,
                comments::Column::CreatedAt,
            ])
            .column_as(users::Column::Username, "username")
            .join(JoinType::InnerJoin, comments::Relation::User.def())
            .filter(comments::Column::PostId.eq(post_id))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::Id)
            .into_model::<CommentWithAuthor>()
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
