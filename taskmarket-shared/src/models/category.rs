/// Skill categories and helper skill associations
///
/// Categories form a two-level tree (category → sub-category). Helpers pick
/// a sub-category at registration, recorded in `account_skills`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     parent_id UUID REFERENCES categories(id) ON DELETE CASCADE,
///     name VARCHAR(120) NOT NULL,
///     slug VARCHAR(140) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE account_skills (
///     account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (account_id, category_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Category row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    /// None for top-level categories
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategory {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
}

impl Category {
    pub async fn create<'e, E>(executor: E, data: CreateCategory) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (parent_id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, parent_id, name, slug, created_at
            "#,
        )
        .bind(data.parent_id)
        .bind(data.name)
        .bind(data.slug)
        .fetch_one(executor)
        .await?;

        Ok(category)
    }

    /// Renames a category and replaces its slug
    ///
    /// # Returns
    ///
    /// The updated category, or None if it does not exist
    pub async fn rename<'e, E>(
        executor: E,
        id: Uuid,
        name: &str,
        slug: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $2, slug = $3
            WHERE id = $1
            RETURNING id, parent_id, name, slug, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    /// Every category, parents before their children, each level by name
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, parent_id, name, slug, created_at
            FROM categories
            ORDER BY parent_id IS NOT NULL, name ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(categories)
    }

    pub async fn exists<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;

        Ok(exists)
    }

    /// Attaches a skill category to an account
    ///
    /// Attaching the same pair twice is a no-op.
    pub async fn attach_to_account<'e, E>(
        executor: E,
        account_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO account_skills (account_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT (account_id, category_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(category_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Lists the skill categories attached to an account
    pub async fn list_for_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.parent_id, c.name, c.slug, c.created_at
            FROM categories c
            INNER JOIN account_skills s ON s.category_id = c.id
            WHERE s.account_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(executor)
        .await?;

        Ok(categories)
    }
}
