/// PostgreSQL Identity Store
///
/// [`PgIdentityStore`] reads and writes through the pool;
/// [`PgIdentityTransaction`] wraps a `sqlx::Transaction` so every
/// registration step runs on the same connection. A transaction handle that
/// is dropped without [`commit`](IdentityTransaction::commit) is rolled back
/// by sqlx.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    account::{Account, CreateAccount},
    category::{Category, CreateCategory},
    document::{Document, DocumentKind},
    profile::{CreateProfile, Profile},
};
use crate::services::ports::{IdentityStore, IdentityTransaction, StoreError};

/// Identity Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn begin(&self) -> Result<Box<dyn IdentityTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgIdentityTransaction { tx: Some(tx) }))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_email(&self.pool, email).await?)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(Account::find_by_id(&self.pool, id).await?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(Account::email_exists(&self.pool, email).await?)
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Category::exists(&self.pool, id).await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(Category::list(&self.pool).await?)
    }

    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError> {
        Ok(Category::create(&self.pool, data).await?)
    }

    async fn rename_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
    ) -> Result<Option<Category>, StoreError> {
        Ok(Category::rename(&self.pool, id, name, slug).await?)
    }

    async fn mark_email_verified(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(Account::mark_email_verified(&self.pool, email).await?)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, StoreError> {
        Ok(Account::update_password(&self.pool, email, password_hash).await?)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Account::delete(&self.pool, id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open transaction on one pooled connection
pub struct PgIdentityTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgIdentityTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl IdentityTransaction for PgIdentityTransaction {
    async fn handle_exists(&mut self, handle: &str) -> Result<bool, StoreError> {
        Ok(Account::handle_exists(&mut **self.tx()?, handle).await?)
    }

    async fn create_account(&mut self, data: CreateAccount) -> Result<Account, StoreError> {
        Ok(Account::create(&mut **self.tx()?, data).await?)
    }

    async fn create_profile(
        &mut self,
        account_id: Uuid,
        data: CreateProfile,
    ) -> Result<Profile, StoreError> {
        Ok(Profile::create(&mut **self.tx()?, account_id, data).await?)
    }

    async fn create_document(
        &mut self,
        account_id: Uuid,
        kind: DocumentKind,
        reference: &str,
    ) -> Result<Document, StoreError> {
        Ok(Document::create(&mut **self.tx()?, account_id, kind, reference).await?)
    }

    async fn attach_skill(&mut self, account_id: Uuid, category_id: Uuid) -> Result<(), StoreError> {
        Ok(Category::attach_to_account(&mut **self.tx()?, account_id, category_id).await?)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}
