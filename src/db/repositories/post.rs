use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Expr, Query},
};
use serde::{Deserialize, Serialize};

use crate::db::{StoreError, now_timestamp};
use crate::entities::{comments, followers, posts, users};

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub user_id: i32,
    pub tags: Vec<String>,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<posts::Model> for Post {
    fn from(model: posts::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            user_id: model.user_id,
            tags: decode_tags(&model.tags),
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: i32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Already-validated pagination for the feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedQuery {
    pub limit: u64,
    pub offset: u64,
    pub sort: SortDirection,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            sort: SortDirection::Desc,
        }
    }
}

/// Feed entry: a post with its author's name and comment count.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub username: String,
    pub comment_count: i64,
}

#[derive(Debug, FromQueryResult)]
struct FeedRow {
    id: i32,
    title: String,
    content: String,
    user_id: i32,
    tags: String,
    version: i32,
    created_at: String,
    updated_at: String,
    username: String,
    comment_count: i64,
}

impl From<FeedRow> for FeedPost {
    fn from(row: FeedRow) -> Self {
        Self {
            post: Post {
                id: row.id,
                title: row.title,
                content: row.content,
                user_id: row.user_id,
                tags: decode_tags(&row.tags),
                version: row.version,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            username: row.username,
            comment_count: row.comment_count,
        }
    }
}

pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_post: NewPost) -> Result<Post, StoreError> {
        let now = now_timestamp();

        let model = posts::ActiveModel {
            title: Set(new_post.title),
            content: Set(new_post.content),
            user_id: Set(new_post.user_id),
            tags: Set(encode_tags(&new_post.tags)),
            version: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Post::from(model))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Post>, StoreError> {
        let post = posts::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(post.map(Post::from))
    }

    pub async fn exists(&self, id: i32) -> Result<bool, StoreError> {
        let found = posts::Entity::find_by_id(id)
            .select_only()
            .column(posts::Column::Id)
            .into_tuple::<i32>()
            .one(&self.conn)
            .await?;

        Ok(found.is_some())
    }

    /// Writes title/content only if the stored version still equals
    /// `post.version`. On success `post` carries the bumped version and new
    /// `updated_at`; returns `false` if no row matched.
    pub async fn update_versioned(&self, post: &mut Post) -> Result<bool, StoreError> {
        let now = now_timestamp();

        let result = posts::Entity::update_many()
            .col_expr(posts::Column::Title, Expr::value(post.title.clone()))
            .col_expr(posts::Column::Content, Expr::value(post.content.clone()))
            .col_expr(
                posts::Column::Version,
                Expr::col(posts::Column::Version).add(1),
            )
            .col_expr(posts::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(posts::Column::Id.eq(post.id))
            .filter(posts::Column::Version.eq(post.version))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        post.version += 1;
        post.updated_at = now;
        Ok(true)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = posts::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Posts by `user_id` or anyone they follow, newest first unless
    /// `query.sort` says otherwise. Ties on `created_at` fall back to id.
    pub async fn feed(&self, user_id: i32, query: FeedQuery) -> Result<Vec<FeedPost>, StoreError> {
        let followed = Query::select()
            .column(followers::Column::FollowedId)
            .from(followers::Entity)
            .and_where(Expr::col(followers::Column::FollowerId).eq(user_id))
            .to_owned();

        let order = match query.sort {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };

        let rows = posts::Entity::find()
            .select_only()
            .columns([
                posts::Column::Id,
                posts::Column::Title,
                posts::Column::Content,
                posts::Column::UserId,
                posts::Column::Tags,
                posts::Column::Version,
                posts::Column::CreatedAt,
                posts::Column::UpdatedAt,
            ])
            .column_as(users::Column::Username, "username")
            .column_as(
                Expr::col((comments::Entity, comments::Column::Id)).count(),
                "comment_count",
            )
            .join(JoinType::InnerJoin, posts::Relation::User.def())
            .join(JoinType::LeftJoin, posts::Relation::Comments.def())
            .filter(
                Condition::any()
                    .add(posts::Column::UserId.eq(user_id))
                    .add(posts::Column::UserId.in_subquery(followed)),
            )
            .group_by(posts::Column::Id)
            .group_by(users::Column::Username)
            .order_by(posts::Column::CreatedAt, order.clone())
            .order_by(posts::Column::Id, order)
            .limit(query.limit)
            .offset(query.offset)
            .into_model::<FeedRow>()
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(FeedPost::from).collect())
    }
}
