use crate::entities::{comments, followers, posts};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_user_created")
                    .table(posts::Entity)
                    .col(posts::Column::UserId)
                    .col(posts::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comments_post")
                    .table(comments::Entity)
                    .col(comments::Column::PostId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Reverse lookups ("who follows X") are not covered by the primary key.
        manager
            .create_index(
                Index::create()
                    .name("idx_followers_followed")
                    .table(followers::Entity)
                    .col(followers::Column::FollowedId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_followers_followed",
            "idx_comments_post",
            "idx_posts_user_created",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }

        Ok(())
    }
}
