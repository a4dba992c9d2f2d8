/// One-time verification codes
///
/// Codes are keyed by destination (an email address or phone number), not
/// by account, and only their SHA-256 hash is stored. A code is burnt after
/// [`MAX_ATTEMPTS`] wrong guesses.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE otp_channel AS ENUM ('email', 'sms');
///
/// CREATE TABLE otp_codes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     destination VARCHAR(255) NOT NULL,
///     channel otp_channel NOT NULL,
///     code_hash CHAR(64) NOT NULL,
///     attempts INTEGER NOT NULL DEFAULT 0,
///     expires_at TIMESTAMPTZ NOT NULL,
///     consumed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Wrong guesses allowed before a live code is burnt
pub const MAX_ATTEMPTS: i32 = 5;

/// Contact channel a code is delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Email,
    Sms,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Email => "email",
            OtpChannel::Sms => "sms",
        }
    }
}

/// OTP code row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpCode {
    pub id: Uuid,
    pub destination: String,
    pub channel: OtpChannel,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    /// Stores a new code, invalidating earlier unconsumed codes for the same
    /// destination and channel
    pub async fn create<'e, E>(
        executor: E,
        destination: &str,
        channel: OtpChannel,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let code = sqlx::query_as::<_, OtpCode>(
            r#"
            WITH superseded AS (
                UPDATE otp_codes
                SET consumed_at = NOW()
                WHERE destination = $1 AND channel = $2 AND consumed_at IS NULL
            )
            INSERT INTO otp_codes (destination, channel, code_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, destination, channel, code_hash, attempts, expires_at, consumed_at, created_at
            "#,
        )
        .bind(destination)
        .bind(channel)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;

        Ok(code)
    }

    /// Checks a guess against the live code for a destination
    ///
    /// A match consumes the code. A miss counts as an attempt, and the
    /// [`MAX_ATTEMPTS`]th miss consumes the code as well, so every later
    /// guess fails until a new code is sent.
    ///
    /// # Returns
    ///
    /// True if the live, unexpired code matched
    pub async fn consume<'e, E>(
        executor: E,
        destination: &str,
        channel: OtpChannel,
        code_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let matched: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE otp_codes
            SET attempts = attempts + CASE WHEN code_hash = $3 THEN 0 ELSE 1 END,
                consumed_at = CASE
                    WHEN code_hash = $3 OR attempts + 1 >= $4 THEN NOW()
                    ELSE NULL
                END
            WHERE destination = $1
              AND channel = $2
              AND consumed_at IS NULL
              AND expires_at > NOW()
            RETURNING code_hash = $3
            "#,
        )
        .bind(destination)
        .bind(channel)
        .bind(code_hash)
        .bind(MAX_ATTEMPTS)
        .fetch_optional(executor)
        .await?;

        Ok(matched.unwrap_or(false))
    }

    /// Deletes consumed and expired codes
    ///
    /// # Returns
    ///
    /// Number of rows removed
    pub async fn purge_stale<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM otp_codes WHERE consumed_at IS NOT NULL OR expires_at <= NOW()",
        )
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
