use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, Query},
};
use serde::Serialize;

use crate::db::{StoreError, now_timestamp};
use crate::entities::{user_invitations, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Row data for a registration: the user plus the invitation minted for it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub token_fingerprint: String,
    pub invitation_expiry: String,
}

/// Which uniqueness constraint rejected a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    /// Matches the `table.column` target reported by a unique violation.
    /// SQLite only reports the message (`UNIQUE constraint failed: users.email`),
    /// so another backend needs its own constraint-name mapping here.
    #[must_use]
    pub fn from_target(target: &str) -> Option<Self> {
        let email = qualified(users::Column::Email);
        let username = qualified(users::Column::Username);

        if target.contains(&email) {
            Some(Self::Email)
        } else if target.contains(&username) {
            Some(Self::Username)
        } else {
            None
        }
    }
}

fn qualified(column: users::Column) -> String {
    use sea_orm::{EntityName, IdenStatic};
    format!("{}.{}", users::Entity.table_name(), column.as_str())
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts the user and its invitation in one transaction.
    pub async fn create_with_invitation(&self, new_user: NewUser) -> Result<User, StoreError> {
        let txn = self.conn.begin().await?;
        let now = now_timestamp();

        let user = users::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            is_active: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        user_invitations::ActiveModel {
            token: Set(new_user.token_fingerprint),
            user_id: Set(user.id),
            expiry: Set(new_user.invitation_expiry),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(User::from(user))
    }

    /// Redeems a live invitation. Returns `false` when no unexpired invitation
    /// carries this fingerprint; nothing is written in that case.
    ///
    /// The first statement writes, so a concurrent redemption of the same
    /// token queues on the write lock and then matches no row.
    pub async fn activate(&self, token_fingerprint: &str, now: &str) -> Result<bool, StoreError> {
        let txn = self.conn.begin().await?;

        let live_invitation = Query::select()
            .column(user_invitations::Column::UserId)
            .from(user_invitations::Entity)
            .and_where(Expr::col(user_invitations::Column::Token).eq(token_fingerprint))
            .and_where(Expr::col(user_invitations::Column::Expiry).gt(now))
            .to_owned();

        let activated = users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(true))
            .col_expr(users::Column::UpdatedAt, Expr::value(now.to_string()))
            .filter(users::Column::Id.in_subquery(live_invitation))
            .exec(&txn)
            .await?;

        if activated.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        user_invitations::Entity::delete_many()
            .filter(user_invitations::Column::Token.eq(token_fingerprint))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(true)
    }

    /// Removes the user and any invitation it still holds.
    pub async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let txn = self.conn.begin().await?;

        user_invitations::Entity::delete_many()
            .filter(user_invitations::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        let result = users::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let user = users::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(user.map(User::from))
    }

    /// Get user by email with password hash (for credential checks)
    pub async fn get_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn exists(&self, id: i32) -> Result<bool, StoreError> {
        let found = users::Entity::find_by_id(id)
            .select_only()
            .column(users::Column::Id)
            .into_tuple::<i32>()
            .one(&self.conn)
            .await?;

        Ok(found.is_some())
    }

    pub async fn get_invitation(
        &self,
        user_id: i32,
    ) -> Result<Option<user_invitations::Model>, StoreError> {
        let invitation = user_invitations::Entity::find()
            .filter(user_invitations::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?;

        Ok(invitation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_from_sqlite_target() {
        assert_eq!(
            UniqueField::from_target("UNIQUE constraint failed: users.email"),
            Some(UniqueField::Email)
        );
        assert_eq!(
            UniqueField::from_target("UNIQUE constraint failed: users.username"),
            Some(UniqueField::Username)
        );
        assert_eq!(
            UniqueField::from_target("UNIQUE constraint failed: user_invitations.user_id"),
            None
        );
    }
}
