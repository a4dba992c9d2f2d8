/// JWT Token Issuer with a revocation denylist
///
/// Tokens are stateless HS256 JWTs (see [`crate::auth::jwt`]). Logout
/// records the token's `jti` in a [`TokenDenylist`] until the token would
/// have expired, and [`JwtTokenIssuer::validate`] consults it on every
/// request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    jwt::{create_token, validate_token, Claims},
    password::verify_password,
};
use crate::models::{account::Account, revoked_token::RevokedToken};
use crate::services::ports::{StoreError, TokenError, TokenIssuer};

/// Storage for revoked token IDs
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError>;
}

/// Denylist kept in the `revoked_tokens` table
#[derive(Debug, Clone)]
pub struct PgTokenDenylist {
    pool: PgPool,
}

impl PgTokenDenylist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenDenylist for PgTokenDenylist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(RevokedToken::revoke(&self.pool, jti, expires_at).await?)
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(RevokedToken::is_revoked(&self.pool, jti).await?)
    }
}

/// Token Issuer signing HS256 JWTs
pub struct JwtTokenIssuer {
    secret: String,
    ttl: Duration,
    denylist: Arc<dyn TokenDenylist>,
}

impl JwtTokenIssuer {
    pub fn new(secret: impl Into<String>, ttl: Duration, denylist: Arc<dyn TokenDenylist>) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            denylist,
        }
    }

    fn sign(&self, account: &Account) -> Result<String, TokenError> {
        let claims = Claims::new(account.id, account.role, self.ttl);
        Ok(create_token(&claims, &self.secret)?)
    }
}

#[async_trait]
impl TokenIssuer for JwtTokenIssuer {
    async fn issue_from_credentials(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<Option<String>, TokenError> {
        if !verify_password(password, &account.password_hash)? {
            tracing::debug!(account_id = %account.id, "Credentials did not match, no token issued");
            return Ok(None);
        }

        self.sign(account).map(Some)
    }

    async fn issue_from_account(&self, account: &Account) -> Result<Option<String>, TokenError> {
        self.sign(account).map(Some)
    }

    async fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = validate_token(token, &self.secret)?;

        if self.denylist.is_revoked(claims.jti).await? {
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    async fn invalidate(&self, token: &str) -> Result<(), TokenError> {
        let claims = validate_token(token, &self.secret)?;
        self.denylist.revoke(claims.jti, claims.expires_at()).await?;

        tracing::debug!(jti = %claims.jti, account_id = %claims.sub, "Token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::memory::MemoryDenylist;
    use crate::models::account::AccountRole;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(SECRET, Duration::hours(1), Arc::new(MemoryDenylist::new()))
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            handle: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: hash_password("secret123").unwrap(),
            role: AccountRole::User,
            email_verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_issue_from_credentials() {
        let issuer = issuer();
        let account = account();

        let token = issuer
            .issue_from_credentials(&account, "secret123")
            .await
            .unwrap()
            .expect("matching password issues a token");
        assert_eq!(issuer.validate(&token).await.unwrap().sub, account.id);

        assert!(issuer
            .issue_from_credentials(&account, "wrong-password")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_invalidate_only_affects_one_token() {
        let issuer = issuer();
        let account = account();

        let first = issuer.issue_from_account(&account).await.unwrap().unwrap();
        let second = issuer.issue_from_account(&account).await.unwrap().unwrap();

        issuer.invalidate(&first).await.unwrap();

        assert!(matches!(issuer.validate(&first).await, Err(TokenError::Revoked)));
        assert!(issuer.validate(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_rejects_garbage() {
        assert!(matches!(
            issuer().invalidate("not.a.jwt").await,
            Err(TokenError::Jwt(_))
        ));
    }
}
