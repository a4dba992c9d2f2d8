/// Images attached to tasks and reviews
///
/// The owning row is a discriminated relation `(owner_type, owner_id)`,
/// exposed in Rust as the tagged [`ImageOwner`] enum.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE image_owner AS ENUM ('task', 'review');
///
/// CREATE TABLE images (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_type image_owner NOT NULL,
///     owner_id UUID NOT NULL,
///     url VARCHAR(512) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Discriminator column values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "image_owner", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageOwnerType {
    Task,
    Review,
}

/// Row that owns an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ImageOwner {
    Task(Uuid),
    Review(Uuid),
}

impl ImageOwner {
    /// Splits the owner into its `(owner_type, owner_id)` columns
    pub fn into_parts(self) -> (ImageOwnerType, Uuid) {
        match self {
            ImageOwner::Task(id) => (ImageOwnerType::Task, id),
            ImageOwner::Review(id) => (ImageOwnerType::Review, id),
        }
    }

    pub fn from_parts(owner_type: ImageOwnerType, owner_id: Uuid) -> Self {
        match owner_type {
            ImageOwnerType::Task => ImageOwner::Task(owner_id),
            ImageOwnerType::Review => ImageOwner::Review(owner_id),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    owner_type: ImageOwnerType,
    owner_id: Uuid,
    url: String,
    created_at: DateTime<Utc>,
}

/// Image attached to a task or review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub owner: ImageOwner,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            owner: ImageOwner::from_parts(row.owner_type, row.owner_id),
            url: row.url,
            created_at: row.created_at,
        }
    }
}

impl Image {
    pub async fn create<'e, E>(executor: E, owner: ImageOwner, url: &str) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (owner_type, owner_id) = owner.into_parts();

        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            INSERT INTO images (owner_type, owner_id, url)
            VALUES ($1, $2, $3)
            RETURNING id, owner_type, owner_id, url, created_at
            "#,
        )
        .bind(owner_type)
        .bind(owner_id)
        .bind(url)
        .fetch_one(executor)
        .await?;

        Ok(row.into())
    }

    /// Lists the images of one owner, oldest first
    pub async fn list_for<'e, E>(executor: E, owner: ImageOwner) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (owner_type, owner_id) = owner.into_parts();

        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, owner_type, owner_id, url, created_at
            FROM images
            WHERE owner_type = $1 AND owner_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_type)
        .bind(owner_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(Image::from).collect())
    }
}
