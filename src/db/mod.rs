use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::comment::{Comment, CommentWithAuthor};
pub use repositories::post::{FeedPost, FeedQuery, NewPost, Post, SortDirection};
pub use repositories::user::{NewUser, UniqueField, User};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage failures, classified from the driver's structured error kind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {target}")]
    UniqueViolation { target: String },

    #[error("foreign key constraint violated")]
    ForeignKeyViolation,

    #[error("storage call exceeded {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Db(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(target)) => Self::UniqueViolation { target },
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::ForeignKeyViolation,
            _ => Self::Db(err),
        }
    }
}

/// Fixed-width UTC timestamp; lexical order matches chronological order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    query_timeout: Duration,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to `:memory:` would be a separate database.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Runs a storage call under the uniform per-operation ceiling. A
    /// transaction still open when the ceiling hits is dropped and rolled back.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))?
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn follower_repo(&self) -> repositories::follower::FollowerRepository {
        repositories::follower::FollowerRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user_with_invitation(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.bounded(self.user_repo().create_with_invitation(new_user))
            .await
    }

    pub async fn activate_user(&self, token_fingerprint: &str) -> Result<bool, StoreError> {
        let now = now_timestamp();
        self.bounded(self.user_repo().activate(token_fingerprint, &now))
            .await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        self.bounded(self.user_repo().delete(id)).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.bounded(self.user_repo().get_by_id(id)).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        self.bounded(self.user_repo().get_by_email_with_password(email))
            .await
    }

    pub async fn user_exists(&self, id: i32) -> Result<bool, StoreError> {
        self.bounded(self.user_repo().exists(id)).await
    }

    pub async fn get_user_invitation(
        &self,
        user_id: i32,
    ) -> Result<Option<crate::entities::user_invitations::Model>, StoreError> {
        self.bounded(self.user_repo().get_invitation(user_id)).await
    }

    // ========================================================================
    // Posts
    // ========================================================================

    pub async fn create_post(&self, new_post: NewPost) -> Result<Post, StoreError> {
        self.bounded(self.post_repo().create(new_post)).await
    }

    pub async fn get_post(&self, id: i32) -> Result<Option<Post>, StoreError> {
        self.bounded(self.post_repo().get_by_id(id)).await
    }

    pub async fn post_exists(&self, id: i32) -> Result<bool, StoreError> {
        self.bounded(self.post_repo().exists(id)).await
    }

    pub async fn update_post_versioned(&self, post: &mut Post) -> Result<bool, StoreError> {
        let repo = self.post_repo();
        self.bounded(repo.update_versioned(post)).await
    }

    pub async fn delete_post(&self, id: i32) -> Result<bool, StoreError> {
        self.bounded(self.post_repo().delete(id)).await
    }

    pub async fn get_user_feed(
        &self,
        user_id: i32,
        query: FeedQuery,
    ) -> Result<Vec<FeedPost>, StoreError> {
        self.bounded(self.post_repo().feed(user_id, query)).await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub async fn create_comment(
        &self,
        post_id: i32,
        user_id: i32,
        content: &str,
    ) -> Result<Comment, StoreError> {
        self.bounded(self.comment_repo().create(post_id, user_id, content))
            .await
    }

    pub async fn list_comments(&self, post_id: i32) -> Result<Vec<CommentWithAuthor>, StoreError> {
        self.bounded(self.comment_repo().list_for_post(post_id))
            .await
    }

    // ========================================================================
    // Followers
    // ========================================================================

    pub async fn follow(&self, follower_id: i32, followed_id: i32) -> Result<(), StoreError> {
        self.bounded(self.follower_repo().follow(follower_id, followed_id))
            .await
    }

    pub async fn unfollow(&self, follower_id: i32, followed_id: i32) -> Result<u64, StoreError> {
        self.bounded(self.follower_repo().unfollow(follower_id, followed_id))
            .await
    }
}
