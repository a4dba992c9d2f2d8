/// Payment recording against tasks

use sqlx::PgPool;
use uuid::Uuid;

use super::error::ServiceError;
use crate::models::{
    task::{Task, TaskStatus},
    transaction::{CreateTransaction, Transaction, TransactionStatus},
};

/// Reasons a payment cannot be recorded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentRejection {
    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Currency must be a three-letter ISO 4217 code")]
    InvalidCurrency,

    #[error("Only the task's client can pay for it")]
    NotClient,

    #[error("Task is cancelled")]
    TaskCancelled,
}

/// Checks a payment against the task it is for
pub fn check_payment(task: &Task, data: &CreateTransaction) -> Result<(), PaymentRejection> {
    if data.amount_cents <= 0 {
        return Err(PaymentRejection::NonPositiveAmount);
    }

    if data.currency.len() != 3 || !data.currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(PaymentRejection::InvalidCurrency);
    }

    if data.payer_id != task.client_id {
        return Err(PaymentRejection::NotClient);
    }

    if task.status == TaskStatus::Cancelled
        && data.status != TransactionStatus::Refunded
    {
        return Err(PaymentRejection::TaskCancelled);
    }

    Ok(())
}

/// Records a payment for a task after checking it
///
/// # Errors
///
/// - [`ServiceError::TaskNotFound`] if the task does not exist
/// - [`ServiceError::PaymentRejected`] if [`check_payment`] refuses it
pub async fn store_transaction(
    pool: &PgPool,
    data: CreateTransaction,
) -> Result<Transaction, ServiceError> {
    let task = Task::find_by_id(pool, data.task_id)
        .await
        .map_err(|e| store_failure("transaction::store_transaction", e))?
        .ok_or(ServiceError::TaskNotFound)?;

    if let Err(rejection) = check_payment(&task, &data) {
        tracing::warn!(task_id = %task.id, reason = %rejection, "Payment rejected");
        return Err(rejection.into());
    }

    let transaction = Transaction::create(pool, data)
        .await
        .map_err(|e| store_failure("transaction::store_transaction", e))?;

    tracing::info!(
        transaction_id = %transaction.id,
        task_id = %transaction.task_id,
        amount_cents = transaction.amount_cents,
        "Transaction recorded"
    );

    Ok(transaction)
}

/// Transactions recorded for a task, oldest first
pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Transaction>, ServiceError> {
    Transaction::list_by_task(pool, task_id)
        .await
        .map_err(|e| store_failure("transaction::list_for_task", e))
}

fn store_failure(component: &'static str, err: sqlx::Error) -> ServiceError {
    tracing::error!(component, error = %err, "Transaction store failure");
    ServiceError::Store(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            helper_id: None,
            category_id: Uuid::new_v4(),
            title: "Fix the sink".to_string(),
            description: "Kitchen sink drips".to_string(),
            price_cents: 5_000,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment(task: &Task) -> CreateTransaction {
        CreateTransaction {
            task_id: task.id,
            payer_id: task.client_id,
            amount_cents: 5_000,
            currency: "EUR".to_string(),
            status: TransactionStatus::Succeeded,
            provider_reference: Some("pi_123".to_string()),
        }
    }

    #[test]
    fn test_valid_payment() {
        let task = task(TaskStatus::Assigned);
        assert_eq!(check_payment(&task, &payment(&task)), Ok(()));
    }

    #[test]
    fn test_rejections() {
        let task = task(TaskStatus::Open);

        let mut data = payment(&task);
        data.amount_cents = 0;
        assert_eq!(check_payment(&task, &data), Err(PaymentRejection::NonPositiveAmount));

        let mut data = payment(&task);
        data.currency = "eur".to_string();
        assert_eq!(check_payment(&task, &data), Err(PaymentRejection::InvalidCurrency));

        let mut data = payment(&task);
        data.payer_id = Uuid::new_v4();
        assert_eq!(check_payment(&task, &data), Err(PaymentRejection::NotClient));
    }

    #[test]
    fn test_cancelled_task_only_accepts_refunds() {
        let task = task(TaskStatus::Cancelled);

        assert_eq!(
            check_payment(&task, &payment(&task)),
            Err(PaymentRejection::TaskCancelled)
        );

        let mut refund = payment(&task);
        refund.status = TransactionStatus::Refunded;
        assert_eq!(check_payment(&task, &refund), Ok(()));
    }
}
