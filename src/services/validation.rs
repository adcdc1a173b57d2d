//! Stateless payload checks shared by the HTTP layer and the services.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const USERNAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const PASSWORD_MIN_CHARS: usize = 3;
pub const PASSWORD_MAX_CHARS: usize = 72;
pub const POST_TITLE_MAX_CHARS: usize = 100;
pub const POST_CONTENT_MAX_CHARS: usize = 10_000;
pub const COMMENT_MAX_CHARS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("Invalid regex pattern defined in code")
    })
}

fn required(field: &str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(ValidationError::new(format!(
            "{field} must be {max_chars} characters or less"
        )));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    required("username", username, USERNAME_MAX_CHARS)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    required("email", email, EMAIL_MAX_CHARS)?;
    if !email_regex().is_match(email) {
        return Err(ValidationError::new("email must be a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
        return Err(ValidationError::new(format!(
            "password must be between {PASSWORD_MIN_CHARS} and {PASSWORD_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)
}

pub fn validate_post_title(title: &str) -> Result<(), ValidationError> {
    required("title", title, POST_TITLE_MAX_CHARS)
}

pub fn validate_post_content(content: &str) -> Result<(), ValidationError> {
    required("content", content, POST_CONTENT_MAX_CHARS)
}

pub fn validate_comment_content(content: &str) -> Result<(), ValidationError> {
    required("content", content, COMMENT_MAX_CHARS)
}

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::new(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}
