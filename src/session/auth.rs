use crate::error::{CoordinatorError, Result};
use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session validation seam. The identity provider itself is an external
/// collaborator; the coordinator only checks that a token belongs to the
/// claimed account.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn validate(&self, oid_user: u64, token: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// HS256 bearer tokens signed with the shared `AUTH_SECRET`.
pub struct JwtAuthenticator {
    secret: String,
}

impl JwtAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token for an account (used by tooling and tests).
    pub fn issue(&self, oid_user: u64, ttl_seconds: u64) -> Result<String> {
        let claims = Claims {
            sub: oid_user.to_string(),
            exp: (chrono::Utc::now().timestamp() as u64 + ttl_seconds) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| CoordinatorError::AuthFailed(e.to_string()))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn validate(&self, oid_user: u64, token: &str) -> Result<()> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| CoordinatorError::AuthFailed(e.to_string()))?;

        if data.claims.sub != oid_user.to_string() {
            return Err(CoordinatorError::AuthFailed(
                "token subject mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts any token. Development and test harnesses only.
pub struct AllowAllAuthenticator;

#[async_trait]
impl Authenticator for AllowAllAuthenticator {
    async fn validate(&self, _oid_user: u64, _token: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_validates_for_its_subject() {
        let auth = JwtAuthenticator::new("test-secret");
        let token = auth.issue(42, 60).unwrap();
        assert!(auth.validate(42, &token).await.is_ok());
        assert!(auth.validate(43, &token).await.is_err());
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let auth = JwtAuthenticator::new("test-secret");
        assert!(auth.validate(42, "not-a-jwt").await.is_err());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let issuer = JwtAuthenticator::new("secret-a");
        let verifier = JwtAuthenticator::new("secret-b");
        let token = issuer.issue(42, 60).unwrap();
        assert!(verifier.validate(42, &token).await.is_err());
    }
}
