/// Account model and database operations
///
/// Accounts are the registered identities of the marketplace. Every account
/// carries a role (`user`, `helper` or `admin`) and exactly one profile.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_role AS ENUM ('user', 'helper', 'admin');
///
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     handle VARCHAR(120) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     role account_role NOT NULL DEFAULT 'user',
///     email_verified_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Emails are stored lowercased. Every query in this module normalizes the
/// email it binds with [`normalize_email`], so lookups are case-insensitive
/// and deterministic.
///
/// # Example
///
/// ```no_run
/// use taskmarket_shared::models::account::{Account, AccountRole, CreateAccount};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let account = Account::create(&pool, CreateAccount {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     handle: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: AccountRole::User,
/// }).await?;
///
/// let found = Account::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|a| a.id), Some(account.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Role of an account on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Client posting tasks
    User,

    /// Service provider with verified documents and skills
    Helper,

    /// Backend administrator
    Admin,
}

impl AccountRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Helper => "helper",
            AccountRole::Admin => "admin",
        }
    }

    /// Whether accounts with this role may delete themselves
    pub fn can_self_delete(&self) -> bool {
        !matches!(self, AccountRole::Admin)
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account row
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The hash is
/// skipped when serializing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    pub first_name: String,

    pub last_name: String,

    /// Unique, human-readable identifier derived from the first name
    pub handle: String,

    /// Lowercased email address, unique across all accounts
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: AccountRole,

    /// When the email address was confirmed (None until verified)
    pub email_verified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    /// Normalized before insert
    pub email: String,
    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,
    pub role: AccountRole,
}

/// Lowercases and trims an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Account {
    /// Whether the account email has been confirmed
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Creates a new account
    ///
    /// Accepts any executor so the insert can take part in a surrounding
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or handle already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateAccount) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (first_name, last_name, handle, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, handle, email, password_hash, role,
                      email_verified_at, created_at, updated_at
            "#,
        )
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.handle)
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(executor)
        .await?;

        Ok(account)
    }

    /// Finds an account by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, first_name, last_name, handle, email, password_hash, role,
                   email_verified_at, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    /// Finds an account by email address (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, first_name, last_name, handle, email, password_hash, role,
                   email_verified_at, created_at, updated_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    /// Checks whether an email address is already registered
    pub async fn email_exists<'e, E>(executor: E, email: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)")
                .bind(normalize_email(email))
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    /// Checks whether a handle is already taken
    pub async fn handle_exists<'e, E>(executor: E, handle: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE handle = $1)")
                .bind(handle)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    /// Sets `email_verified_at` to now if it is not already set
    ///
    /// # Returns
    ///
    /// The updated account, or None if no account has this email
    pub async fn mark_email_verified<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET email_verified_at = COALESCE(email_verified_at, NOW()),
                updated_at = NOW()
            WHERE email = $1
            RETURNING id, first_name, last_name, handle, email, password_hash, role,
                      email_verified_at, created_at, updated_at
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    /// Replaces the password hash for the account with this email
    ///
    /// # Returns
    ///
    /// True if an account was updated
    pub async fn update_password<'e, E>(
        executor: E,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes an account by ID
    ///
    /// Profiles, documents and skill associations cascade.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
