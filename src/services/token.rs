//! Bearer tokens (HS256 JWT) for the authenticated API surface.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string per RFC 7519.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    audience: String,
    issuer: String,
    ttl: Duration,
}

impl TokenAuthenticator {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            ttl: Duration::hours(config.expiry_hours),
        }
    }

    pub fn issue(&self, user_id: i32) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_nbf = true;

        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret".to_string(),
            audience: "postline".to_string(),
            issuer: "postline".to_string(),
            expiry_hours: 1,
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let auth = TokenAuthenticator::new(&config());
        let token = auth.issue(42).unwrap();
        let claims = auth.validate(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.aud, "postline");
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = TokenAuthenticator::new(&config()).issue(1).unwrap();

        let mut other = config();
        other.secret = "different".to_string();
        assert!(TokenAuthenticator::new(&other).validate(&token).is_err());
    }

    #[test]
    fn test_rejects_wrong_audience() {
        let token = TokenAuthenticator::new(&config()).issue(1).unwrap();

        let mut other = config();
        other.audience = "someone-else".to_string();
        assert!(TokenAuthenticator::new(&other).validate(&token).is_err());
    }

    #[test]
    fn test_rejects_expired() {
        let mut expired = config();
        expired.expiry_hours = -2;
        let auth = TokenAuthenticator::new(&expired);
        let token = auth.issue(1).unwrap();
        assert!(auth.validate(&token).is_err());
    }
}
