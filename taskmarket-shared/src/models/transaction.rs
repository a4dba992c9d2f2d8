/// Payment transactions recorded against tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

/// Transaction row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub task_id: Uuid,
    pub payer_id: Uuid,
    /// Amount in minor units
    pub amount_cents: i64,
    /// ISO 4217 code
    pub currency: String,
    pub status: TransactionStatus,
    /// Payment provider charge/intent ID
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub task_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub provider_reference: Option<String>,
}

impl Transaction {
    pub async fn create<'e, E>(executor: E, data: CreateTransaction) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (task_id, payer_id, amount_cents, currency, status, provider_reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, task_id, payer_id, amount_cents, currency, status,
                      provider_reference, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.payer_id)
        .bind(data.amount_cents)
        .bind(data.currency)
        .bind(data.status)
        .bind(data.provider_reference)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn list_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, task_id, payer_id, amount_cents, currency, status,
                   provider_reference, created_at
            FROM transactions
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await?;

        Ok(transactions)
    }
}
