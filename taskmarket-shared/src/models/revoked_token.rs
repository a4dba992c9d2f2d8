/// Denylist of invalidated bearer tokens
///
/// Tokens are identified by their `jti` claim and kept until they would have
/// expired anyway.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

pub struct RevokedToken;

impl RevokedToken {
    /// Records a token as revoked (idempotent)
    pub async fn revoke<'e, E>(executor: E, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn is_revoked<'e, E>(executor: E, jti: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let revoked: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
            .bind(jti)
            .fetch_one(executor)
            .await?;

        Ok(revoked)
    }

    /// Deletes denylist entries whose tokens have expired
    pub async fn purge_expired<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
