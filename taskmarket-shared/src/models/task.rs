/// Marketplace task model
///
/// A task is posted by a client (an account with role `user`), optionally
/// assigned to a helper, and tagged with the skill category it needs.
///
/// # Relations
///
/// - `client_id` → accounts
/// - `helper_id` → accounts (None until assigned)
/// - `category_id` → categories (the required skill)
/// - one optional [`Review`](super::review::Review)
/// - many [`Transaction`](super::transaction::Transaction)s
/// - many [`Image`](super::image::Image)s via `ImageOwner::Task`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub client_id: Uuid,
    pub helper_id: Option<Uuid>,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for posting a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub client_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
}

impl Task {
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (client_id, category_id, title, description, price_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, client_id, helper_id, category_id, title, description,
                      price_cents, status, created_at, updated_at
            "#,
        )
        .bind(data.client_id)
        .bind(data.category_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price_cents)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, client_id, helper_id, category_id, title, description,
                   price_cents, status, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Assigns a helper to an open task
    ///
    /// # Returns
    ///
    /// The updated task, or None if the task does not exist or is not open
    pub async fn assign_helper<'e, E>(
        executor: E,
        id: Uuid,
        helper_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET helper_id = $2, status = 'assigned', updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING id, client_id, helper_id, category_id, title, description,
                      price_cents, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(helper_id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Lists tasks posted by a client, newest first
    pub async fn list_by_client<'e, E>(
        executor: E,
        client_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, client_id, helper_id, category_id, title, description,
                   price_cents, status, created_at, updated_at
            FROM tasks
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Open.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
    }
}
