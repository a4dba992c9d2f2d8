/// Profile model
///
/// Each account has exactly one profile (unique `account_id`). Plain users
/// fill in an address, helpers a bio.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL UNIQUE REFERENCES accounts(id) ON DELETE CASCADE,
///     address TEXT,
///     bio TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Profile row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Postal address (plain users)
    pub address: Option<String>,
    /// Free-text description (helpers)
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role-specific profile fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CreateProfile {
    /// Plain user profile
    Address { address: String },

    /// Helper profile
    Bio { bio: String },
}

impl Profile {
    /// Creates the profile for an account
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the account already has a profile.
    pub async fn create<'e, E>(
        executor: E,
        account_id: Uuid,
        data: CreateProfile,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (address, bio) = match data {
            CreateProfile::Address { address } => (Some(address), None),
            CreateProfile::Bio { bio } => (None, Some(bio)),
        };

        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (account_id, address, bio)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, address, bio, created_at, updated_at
            "#,
        )
        .bind(account_id)
        .bind(address)
        .bind(bio)
        .fetch_one(executor)
        .await?;

        Ok(profile)
    }

    /// Finds the profile belonging to an account
    pub async fn find_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, account_id, address, bio, created_at, updated_at
            FROM profiles
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }
}
