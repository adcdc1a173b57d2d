//! Domain service for the user lifecycle.
//!
//! Registration (user + invitation + activation email), activation and
//! credential checks.

use serde::Serialize;
use thiserror::Error;

use crate::db::{StoreError, User};
use crate::services::validation::ValidationError;

/// Errors specific to user lifecycle operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("a user with that email already exists")]
    DuplicateEmail,

    #[error("a user with that username already exists")]
    DuplicateUsername,

    #[error("User not found")]
    NotFound,

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Activation email could not be delivered")]
    EmailDeliveryFailed,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for UserError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result of a successful registration. `token` is the client token mailed
/// to the user; only its fingerprint is stored.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    pub token: String,
}

/// Domain service trait for the user lifecycle.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Creates an inactive user with an invitation and mails the activation
    /// link. If every send attempt fails the user is removed again.
    ///
    /// # Errors
    ///
    /// [`UserError::DuplicateEmail`] / [`UserError::DuplicateUsername`] on a
    /// uniqueness conflict, [`UserError::EmailDeliveryFailed`] after the retry
    /// budget is spent, [`UserError::Internal`] if the cleanup itself fails.
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, UserError>;

    /// Redeems an invitation token.
    ///
    /// # Errors
    ///
    /// [`UserError::NotFound`] for unknown, used or expired tokens alike.
    async fn activate(&self, token: &str) -> Result<(), UserError>;

    /// Deletes the user and any invitation it holds.
    async fn delete_user(&self, user_id: i32) -> Result<(), UserError>;

    async fn get_user(&self, user_id: i32) -> Result<User, UserError>;

    /// Checks email + password for an active user.
    ///
    /// # Errors
    ///
    /// [`UserError::Unauthorized`] for unknown emails, wrong passwords and
    /// accounts that were never activated.
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError>;
}
