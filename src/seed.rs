//! Synthetic data for local development.
//!
//! Each group (users, posts, comments, follows) is written in its own
//! transaction; the first failure rolls that group back and aborts.

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::IndexedRandom;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait, sea_query::OnConflict};
use std::collections::HashSet;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{Store, now_timestamp};
use crate::entities::{comments, followers, posts, users};
use crate::services::hashing;

/// Every seeded account logs in with this password.
pub const SEED_PASSWORD: &str = "password";

const NAMES: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy", "mallory",
    "niaj", "olivia", "peggy", "rupert", "sybil", "trent", "victor", "walter", "yolanda",
];

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "rust", "async", "tokio", "query", "feed",
    "coffee", "river", "garden", "signal", "harbor", "lantern", "meadow", "orbit", "pixel",
    "quartz",
];

#[derive(Debug, Clone, Copy)]
pub struct SeedCounts {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

impl Default for SeedCounts {
    fn default() -> Self {
        Self {
            users: 100,
            posts: 100,
            comments: 100,
            follows: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub follows: usize,
}

fn sentence(rng: &mut impl Rng, words: usize) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(words);
    for _ in 0..words {
        out.push(WORDS.choose(rng).copied().unwrap_or("lorem"));
    }
    out.join(" ")
}

pub async fn seed(store: &Store, security: &SecurityConfig, counts: SeedCounts) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let password_hash = hashing::hash_password(SEED_PASSWORD, security).await?;

    // Users
    let new_users: Vec<users::ActiveModel> = {
        let mut rng = rand::rng();
        (0..counts.users)
            .map(|i| {
                let name = NAMES.choose(&mut rng).copied().unwrap_or("user");
                let suffix: u32 = rng.random_range(1000..10000);
                let username = format!("{name}{i}_{suffix}");
                let now = now_timestamp();
                users::ActiveModel {
                    email: Set(format!("{username}@example.com")),
                    username: Set(username),
                    password_hash: Set(password_hash.clone()),
                    is_active: Set(true),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                }
            })
            .collect()
    };

    let txn = store.conn.begin().await?;
    let mut user_ids = Vec::with_capacity(new_users.len());
    for user in new_users {
        let model = user.insert(&txn).await.context("Error creating user")?;
        user_ids.push(model.id);
    }
    txn.commit().await?;
    summary.users = user_ids.len();

    if user_ids.is_empty() {
        return Ok(summary);
    }

    // Posts
    let new_posts: Vec<posts::ActiveModel> = {
        let mut rng = rand::rng();
        let mut out = Vec::with_capacity(counts.posts);
        for _ in 0..counts.posts {
            let owner = user_ids.choose(&mut rng).copied().unwrap_or(user_ids[0]);
            let tags: Vec<String> = (0..3).map(|_| sentence(&mut rng, 1)).collect();
            let now = now_timestamp();
            out.push(posts::ActiveModel {
                title: Set(sentence(&mut rng, 6)),
                content: Set(sentence(&mut rng, 60)),
                user_id: Set(owner),
                tags: Set(serde_json::to_string(&tags)?),
                version: Set(0),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            });
        }
        out
    };

    let txn = store.conn.begin().await?;
    let mut post_owners = Vec::with_capacity(new_posts.len());
    for post in new_posts {
        let model = post.insert(&txn).await.context("Error creating post")?;
        post_owners.push((model.id, model.user_id));
    }
    txn.commit().await?;
    summary.posts = post_owners.len();

    // Comments
    if !post_owners.is_empty() {
        let new_comments: Vec<comments::ActiveModel> = {
            let mut rng = rand::rng();
            (0..counts.comments)
                .map(|_| {
                    let (post_id, _) = post_owners.choose(&mut rng).copied().unwrap_or(post_owners[0]);
                    let author = user_ids.choose(&mut rng).copied().unwrap_or(user_ids[0]);
                    comments::ActiveModel {
                        post_id: Set(post_id),
                        user_id: Set(author),
                        content: Set(sentence(&mut rng, 20)),
                        created_at: Set(now_timestamp()),
                        ..Default::default()
                    }
                })
                .collect()
        };

        let txn = store.conn.begin().await?;
        for comment in new_comments {
            comment.insert(&txn).await.context("Error creating comment")?;
            summary.comments += 1;
        }
        txn.commit().await?;
    }

    // Follows
    let edges: HashSet<(i32, i32)> = {
        let mut rng = rand::rng();
        let mut edges = HashSet::new();
        if user_ids.len() > 1 {
            for _ in 0..counts.follows {
                let a = user_ids[rng.random_range(0..user_ids.len())];
                let b = user_ids[rng.random_range(0..user_ids.len())];
                if a != b {
                    edges.insert((a, b));
                }
            }
        }
        edges
    };

    if !edges.is_empty() {
        summary.follows = edges.len();
        let now = now_timestamp();
        let models = edges.into_iter().map(|(follower_id, followed_id)| followers::ActiveModel {
            follower_id: Set(follower_id),
            followed_id: Set(followed_id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
        });

        let txn = store.conn.begin().await?;
        followers::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([followers::Column::FollowerId, followers::Column::FollowedId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .context("Error creating follow edges")?;
        txn.commit().await?;
    }

    info!(
        users = summary.users,
        posts = summary.posts,
        comments = summary.comments,
        follows = summary.follows,
        "Seeding complete"
    );

    Ok(summary)
}
