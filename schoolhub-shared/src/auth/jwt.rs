/// Session tokens for the in-memory auth backend
///
/// Sessions are HS256 JWTs carrying the identity id and email. Only the
/// in-memory backend issues them; the hosted auth service issues its own.
///
/// # Example
///
/// ```
/// use schoolhub_shared::auth::jwt::{create_token, validate_token, SessionClaims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = SessionClaims::new("user-1", "admin@jollychildren.edu");
/// let token = create_token(&claims, "local-dev-secret")?;
/// let decoded = validate_token(&token, "local-dev-secret")?;
/// assert_eq!(decoded.sub, "user-1");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer written into every session token
pub const ISSUER: &str = "schoolhub";

/// Session lifetime
pub const SESSION_TTL_HOURS: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,
}

/// Claims of a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity id
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_expiration(sub, email, Duration::hours(SESSION_TTL_HOURS))
    }

    pub fn with_expiration(
        sub: impl Into<String>,
        email: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        SessionClaims {
            sub: sub.into(),
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }
}

pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = 0;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::ValidationError(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_round_trip() {
        let claims = SessionClaims::new("id-7", "teacher@jollychildren.edu");
        let token = create_token(&claims, SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&SessionClaims::new("id-7", "a@b.c"), SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-another-secret-xx"),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_expired_rejected() {
        let claims = SessionClaims::with_expiration("id-7", "a@b.c", Duration::hours(-2));
        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }
}
