//! Token service
//!
//! Issues, verifies, rotates and revokes signed access/refresh token pairs.
//!
//! Both tokens are self-contained HS256 JWTs carrying the account id, a
//! `token_type` claim and a unique `jti`. Refresh tokens are single-use:
//! `refresh` blacklists the consumed token before minting a new pair, and
//! the blacklist insert is atomic at the storage layer, so a replayed
//! refresh token fails the same way an expired or malformed one does.

use crate::config::AuthConfig;
use crate::db::repositories::{BlacklistRepository, UserRepository};
use crate::models::User;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Error types for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is malformed, expired, of the wrong type, or revoked.
    ///
    /// All verification failures collapse into this one variant so callers
    /// cannot distinguish why a credential was rejected.
    #[error("invalid token")]
    InvalidToken,

    /// Internal error (storage failure)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Which of the two tokens in a pair a credential claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Claim set carried by every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (stringified)
    pub sub: String,
    /// Unique token identifier, used as the blacklist key
    pub jti: String,
    /// "access" or "refresh"
    pub token_type: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject claim back into an account id
    pub fn account_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidToken)
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token service
pub struct TokenService {
    users: Arc<dyn UserRepository>,
    blacklist: Arc<dyn BlacklistRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    /// Create a new token service from the auth configuration
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserRepository>,
        blacklist: Arc<dyn BlacklistRepository>,
    ) -> Self {
        Self {
            users,
            blacklist,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_lifetime: Duration::minutes(config.access_token_minutes),
            refresh_lifetime: Duration::days(config.refresh_token_days),
        }
    }

    /// Issue a new token pair for an account.
    ///
    /// Side effect: stamps the account's last login time.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access = self.sign(user.id, TokenKind::Access, now)?;
        let refresh = self.sign(user.id, TokenKind::Refresh, now)?;

        self.users.update_last_login(user.id, now).await?;

        Ok(TokenPair { access, refresh })
    }

    /// Verify a token and return its claims.
    ///
    /// Checks signature, expiry, the `token_type` claim against
    /// `expected`, and that the `jti` has not been blacklisted.
    pub async fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::InvalidToken)?;
        let claims = data.claims;

        if claims.token_type != expected.as_str() {
            return Err(TokenError::InvalidToken);
        }

        if self.blacklist.contains(&claims.jti).await? {
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }

    /// Rotate a refresh token: consume it and issue a brand-new pair.
    ///
    /// The consumed token's `jti` is blacklisted first; if it was already
    /// blacklisted (a concurrent or repeated use), the whole operation
    /// fails with `InvalidToken`. A refresh token is therefore usable
    /// exactly once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh).await?;

        let inserted = self
            .blacklist
            .insert(&claims.jti, claims.expires_at())
            .await?;
        if !inserted {
            return Err(TokenError::InvalidToken);
        }

        let user = self
            .users
            .get_by_id(claims.account_id()?)
            .await?
            .ok_or(TokenError::InvalidToken)?;

        self.issue(&user).await
    }

    /// Revoke a refresh token (logout).
    ///
    /// Fails with `InvalidToken` when the token is malformed, of the wrong
    /// type, expired, or already revoked.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh).await?;

        let inserted = self
            .blacklist
            .insert(&claims.jti, claims.expires_at())
            .await?;
        if !inserted {
            return Err(TokenError::InvalidToken);
        }

        Ok(())
    }

    /// Remove blacklist entries whose natural expiry has passed
    pub async fn purge_expired_blacklist(&self) -> Result<u64, TokenError> {
        Ok(self.blacklist.purge_expired(Utc::now()).await?)
    }

    fn sign(&self, account_id: i64, kind: TokenKind, now: DateTime<Utc>) -> Result<String, TokenError> {
        let lifetime = match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
        };

        let claims = Claims {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            token_type: kind.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxBlacklistRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;

    async fn setup_with_config(
        config: AuthConfig,
    ) -> (TokenService, Arc<dyn UserRepository>, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let blacklist = SqlxBlacklistRepository::boxed(pool.clone());

        let user = users
            .create(&User::new(
                "kira".to_string(),
                "kira@example.com".to_string(),
                hash_password("Sup3rSecret!").unwrap(),
                String::new(),
                String::new(),
            ))
            .await
            .expect("Failed to create user");

        (
            TokenService::new(&config, users.clone(), blacklist),
            users,
            user,
        )
    }

    async fn setup() -> (TokenService, Arc<dyn UserRepository>, User) {
        setup_with_config(AuthConfig {
            secret: "test-secret-key-minimum-32-characters".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
        })
        .await
    }

    // ========================================================================
    // Issue / verify tests
    // ========================================================================

    #[tokio::test]
    async fn test_issue_and_verify_pair() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.expect("Failed to issue");

        let access = service
            .verify(&pair.access, TokenKind::Access)
            .await
            .expect("Access token should verify");
        assert_eq!(access.account_id().unwrap(), user.id);
        assert_eq!(access.token_type, "access");

        let refresh = service
            .verify(&pair.refresh, TokenKind::Refresh)
            .await
            .expect("Refresh token should verify");
        assert_eq!(refresh.account_id().unwrap(), user.id);
        // Each token carries its own jti
        assert_ne!(access.jti, refresh.jti);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_token_type() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        // An access token cannot be used where a refresh token is required
        let result = service.verify(&pair.access, TokenKind::Refresh).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));

        let result = service.verify(&pair.refresh, TokenKind::Access).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let (service, _users, _user) = setup().await;
        let result = service.verify("not-a-token", TokenKind::Access).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_rejects_foreign_signature() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        let (other, _, _) = setup_with_config(AuthConfig {
            secret: "a-completely-different-signing-secret".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
        })
        .await;

        let result = other.verify(&pair.access, TokenKind::Access).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let (service, _users, user) = setup_with_config(AuthConfig {
            secret: "test-secret-key-minimum-32-characters".to_string(),
            access_token_minutes: -5,
            refresh_token_days: 7,
        })
        .await;

        let pair = service.issue(&user).await.unwrap();
        let result = service.verify(&pair.access, TokenKind::Access).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_issue_stamps_last_login() {
        let (service, users, user) = setup().await;
        assert!(user.last_login.is_none());

        service.issue(&user).await.unwrap();

        let reloaded = users
            .get_by_id(user.id)
            .await
            .unwrap()
            .expect("User should exist");
        assert!(reloaded.last_login.is_some());
    }

    // ========================================================================
    // Rotation tests
    // ========================================================================

    #[tokio::test]
    async fn test_refresh_rotates_single_use() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        // First refresh succeeds and returns a brand-new pair
        let rotated = service.refresh(&pair.refresh).await.expect("First refresh");
        assert_ne!(rotated.refresh, pair.refresh);
        assert_ne!(rotated.access, pair.access);

        // Replaying the original refresh token fails
        let result = service.refresh(&pair.refresh).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));

        // The rotated token still works once
        assert!(service.refresh(&rotated.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        let result = service.refresh(&pair.access).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke_then_refresh_fails() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        service.revoke(&pair.refresh).await.expect("Revoke should succeed");

        let result = service.refresh(&pair.refresh).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke_twice_fails() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        service.revoke(&pair.refresh).await.unwrap();
        let result = service.revoke(&pair.refresh).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke_does_not_touch_access_token() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();

        service.revoke(&pair.refresh).await.unwrap();

        // The short-lived access token remains valid until natural expiry
        assert!(service.verify(&pair.access, TokenKind::Access).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_blacklist() {
        let (service, _users, user) = setup().await;
        let pair = service.issue(&user).await.unwrap();
        service.revoke(&pair.refresh).await.unwrap();

        // Entry is still live, nothing to purge
        let purged = service.purge_expired_blacklist().await.unwrap();
        assert_eq!(purged, 0);
    }
}
