//! # Access Tokens
//!
//! HS256 JWTs issued by the local auth provider.
//!
//! ## Claims
//! ```text
//! {
//!   "sub":   "<account id>",
//!   "email": "ada@example.com",
//!   "iat":   1700000000,
//!   "exp":   1700003600,
//!   "jti":   "<session id, row in auth_sessions>"
//! }
//! ```
//! A token is honoured only while `exp` is in the future AND its `jti` row
//! has not been revoked; the signature alone is not enough after sign-out.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BackendError, BackendResult};

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Session id
    pub jti: String,
}

/// A freshly signed token and when it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks access tokens.
pub struct TokenIssuer {
    secret: String,
    access_lifetime_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_lifetime_secs: i64) -> Self {
        TokenIssuer {
            secret: secret.into(),
            access_lifetime_secs,
        }
    }

    /// Issues an access token for an account.
    pub fn issue(&self, account_id: &str, email: &str) -> BackendResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| BackendError::Token(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            claims,
            issued_at,
            expires_at,
        })
    }

    /// Validates signature and expiry and returns the claims.
    pub fn validate(&self, token: &str) -> BackendResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| BackendError::Token(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_roundtrip() {
        let issuer = TokenIssuer::new("test-secret-long-enough", 3600);

        let issued = issuer.issue("acct-1", "ada@example.com").unwrap();
        let claims = issuer.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "acct-1");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.jti, issued.claims.jti);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_each_token_gets_its_own_jti() {
        let issuer = TokenIssuer::new("test-secret-long-enough", 3600);
        let a = issuer.issue("acct-1", "ada@example.com").unwrap();
        let b = issuer.issue("acct-1", "ada@example.com").unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = TokenIssuer::new("secret-one-long-enough", 3600)
            .issue("acct-1", "ada@example.com")
            .unwrap();

        let result = TokenIssuer::new("secret-two-long-enough", 3600).validate(&issued.token);
        assert!(matches!(result, Err(BackendError::Token(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the default 60s leeway.
        let issuer = TokenIssuer::new("test-secret-long-enough", -600);
        let issued = issuer.issue("acct-1", "ada@example.com").unwrap();
        assert!(issuer.validate(&issued.token).is_err());
    }
}
