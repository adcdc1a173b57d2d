//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, MAX_INVITATION_EXPIRY_HOURS, SecurityConfig};
use crate::db::{NewUser, Store, StoreError, UniqueField, User, format_timestamp};
use crate::services::hashing;
use crate::services::mailer::{Mailer, USER_INVITATION_TEMPLATE};
use crate::services::user_service::{Registration, UserError, UserService};
use crate::services::validation;

/// Knobs for the registration workflow, lifted out of [`Config`].
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub security: SecurityConfig,
    pub max_retries: u32,
    pub invitation_ttl: chrono::Duration,
    pub frontend_url: String,
    pub sandbox: bool,
}

impl RegistrationSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            security: config.security.clone(),
            max_retries: config.mail.max_retries,
            invitation_ttl: chrono::Duration::hours(
                config
                    .mail
                    .invitation_expiry_hours
                    .clamp(1, MAX_INVITATION_EXPIRY_HOURS),
            ),
            frontend_url: config.server.frontend_url.clone(),
            sandbox: !config.general.is_production(),
        }
    }

    fn activation_url(&self, token: &str) -> String {
        format!("{}/confirm/{token}", self.frontend_url.trim_end_matches('/'))
    }
}

pub struct SeaOrmUserService {
    store: Store,
    mailer: Arc<dyn Mailer>,
    settings: RegistrationSettings,
}

impl SeaOrmUserService {
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, settings: RegistrationSettings) -> Self {
        Self {
            store,
            mailer,
            settings,
        }
    }

    /// Tries the activation email up to `max_retries` times, back to back.
    async fn send_invitation(&self, user: &User, token: &str) -> bool {
        let vars = HashMap::from([
            ("username".to_string(), user.username.clone()),
            ("activation_url".to_string(), self.settings.activation_url(token)),
            (
                "expiry_hours".to_string(),
                self.settings.invitation_ttl.num_hours().to_string(),
            ),
        ]);

        let attempts = self.settings.max_retries.max(1);
        for attempt in 1..=attempts {
            match self
                .mailer
                .send(
                    USER_INVITATION_TEMPLATE,
                    &user.username,
                    &user.email,
                    &vars,
                    self.settings.sandbox,
                )
                .await
            {
                Ok(status) => {
                    info!(user_id = user.id, attempt, status, "Activation email sent");
                    return true;
                }
                Err(e) => {
                    warn!(
                        user_id = user.id,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Activation email attempt failed"
                    );
                }
            }
        }

        false
    }
}

fn classify_insert_error(err: StoreError) -> UserError {
    if let StoreError::UniqueViolation { target } = &err {
        match UniqueField::from_target(target) {
            Some(UniqueField::Email) => return UserError::DuplicateEmail,
            Some(UniqueField::Username) => return UserError::DuplicateUsername,
            None => {}
        }
    }
    UserError::from(err)
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, UserError> {
        validation::validate_registration(username, email, password)?;

        let password_hash = hashing::hash_password(password, &self.settings.security).await?;

        let expiry = Utc::now()
            .checked_add_signed(self.settings.invitation_ttl)
            .ok_or_else(|| UserError::Internal("invitation expiry out of range".to_string()))?;

        let token = hashing::generate_token();
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            token_fingerprint: hashing::fingerprint_token(&token),
            invitation_expiry: format_timestamp(expiry),
        };

        let user = self
            .store
            .create_user_with_invitation(new_user)
            .await
            .map_err(classify_insert_error)?;

        info!(user_id = user.id, username = %user.username, "User registered");

        if self.send_invitation(&user, &token).await {
            return Ok(Registration { user, token });
        }

        error!(
            user_id = user.id,
            "Activation email undeliverable, removing pending user"
        );

        match self.delete_user(user.id).await {
            Ok(()) | Err(UserError::NotFound) => {}
            Err(e) => {
                error!(user_id = user.id, error = %e, "Failed to remove pending user");
                return Err(UserError::Internal(format!(
                    "user {} left pending after email failure: {e}",
                    user.id
                )));
            }
        }

        Err(UserError::EmailDeliveryFailed)
    }

    async fn activate(&self, token: &str) -> Result<(), UserError> {
        if token.is_empty() {
            return Err(UserError::NotFound);
        }

        let fingerprint = hashing::fingerprint_token(token);
        if !self.store.activate_user(&fingerprint).await? {
            return Err(UserError::NotFound);
        }

        info!("User activated");
        Ok(())
    }

    async fn delete_user(&self, user_id: i32) -> Result<(), UserError> {
        if !self.store.delete_user(user_id).await? {
            return Err(UserError::NotFound);
        }
        Ok(())
    }

    async fn get_user(&self, user_id: i32) -> Result<User, UserError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let Some((user, password_hash)) =
            self.store.get_user_by_email_with_password(email).await?
        else {
            return Err(UserError::Unauthorized);
        };

        if !hashing::verify_password(password, &password_hash).await? {
            return Err(UserError::Unauthorized);
        }

        if !user.is_active {
            return Err(UserError::Unauthorized);
        }

        Ok(user)
    }
}
