/// Uploaded account documents
///
/// Helpers upload one identity document (`id`) and any number of supporting
/// documents (`document`) at registration. The row stores the File Store
/// reference, not the bytes.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE document_kind AS ENUM ('id', 'document');
///
/// CREATE TABLE documents (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     kind document_kind NOT NULL,
///     url VARCHAR(512) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Purpose of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Identity document, exactly one per helper
    Id,

    /// Supporting document (certificates, licences)
    Document,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Id => "id",
            DocumentKind::Document => "document",
        }
    }

    /// File Store namespace for this kind under an account
    ///
    /// ```
    /// use taskmarket_shared::models::document::DocumentKind;
    /// use uuid::Uuid;
    ///
    /// let id = Uuid::nil();
    /// assert_eq!(
    ///     DocumentKind::Id.path_prefix(id),
    ///     "document/00000000-0000-0000-0000-000000000000/id"
    /// );
    /// ```
    pub fn path_prefix(&self, account_id: Uuid) -> String {
        match self {
            DocumentKind::Id => format!("document/{}/id", account_id),
            DocumentKind::Document => format!("document/{}/documents", account_id),
        }
    }
}

/// Document row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: DocumentKind,
    /// File Store reference
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Records a stored file against an account
    pub async fn create<'e, E>(
        executor: E,
        account_id: Uuid,
        kind: DocumentKind,
        url: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (account_id, kind, url)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, kind, url, created_at
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .bind(url)
        .fetch_one(executor)
        .await?;

        Ok(document)
    }

    /// Lists an account's documents, oldest first
    pub async fn list_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, account_id, kind, url, created_at
            FROM documents
            WHERE account_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(executor)
        .await?;

        Ok(documents)
    }
}
