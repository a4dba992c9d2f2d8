/// In-memory collaborators
///
/// Drop-in implementations of the service ports for tests. Each type is a
/// cheap `Clone` handle around shared state, so a test can keep one copy for
/// assertions and hand another to the service under test.
///
/// Enabled for this crate's own tests and, for other crates, through the
/// `test-support` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::{handle::slugify, otp::generate_code, otp::DEFAULT_CODE_LENGTH};
use crate::infra::token::TokenDenylist;
use crate::models::{
    account::{normalize_email, Account, CreateAccount},
    category::{Category, CreateCategory},
    document::{Document, DocumentKind},
    otp_code::{OtpChannel, MAX_ATTEMPTS},
    profile::{CreateProfile, Profile},
};
use crate::services::ports::{
    FileStore, FileStoreError, IdentityStore, IdentityTransaction, OtpDispatcher, OtpError,
    OtpHandle, StoreError, Upload,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Committed contents of a [`MemoryIdentityStore`]
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub profiles: Vec<Profile>,
    pub documents: Vec<Document>,
    /// `(account_id, category_id)` pairs
    pub skills: Vec<(Uuid, Uuid)>,
    pub categories: Vec<Category>,
}

impl Snapshot {
    fn check_unique(&self, data: &CreateAccount) -> Result<(), StoreError> {
        let email = normalize_email(&data.email);

        if self.accounts.iter().any(|a| a.email == email) {
            return Err(StoreError::UniqueViolation {
                constraint: "accounts_email_key".to_string(),
            });
        }

        if self.accounts.iter().any(|a| a.handle == data.handle) {
            return Err(StoreError::UniqueViolation {
                constraint: "accounts_handle_key".to_string(),
            });
        }

        Ok(())
    }

    fn merge(&mut self, staged: Snapshot) {
        self.accounts.extend(staged.accounts);
        self.profiles.extend(staged.profiles);
        self.documents.extend(staged.documents);
        self.skills.extend(staged.skills);
    }
}

fn new_account(data: CreateAccount, verified: bool) -> Account {
    let now = Utc::now();

    Account {
        id: Uuid::new_v4(),
        first_name: data.first_name,
        last_name: data.last_name,
        handle: data.handle,
        email: normalize_email(&data.email),
        password_hash: data.password_hash,
        role: data.role,
        email_verified_at: verified.then_some(now),
        created_at: now,
        updated_at: now,
    }
}

/// Identity Store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    state: Arc<Mutex<Snapshot>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level skill category and returns its ID
    pub fn add_category(&self, name: &str) -> Uuid {
        let category = Category {
            id: Uuid::new_v4(),
            parent_id: None,
            name: name.to_string(),
            slug: slugify(name),
            created_at: Utc::now(),
        };
        let id = category.id;
        lock(&self.state).categories.push(category);
        id
    }

    /// Inserts an account directly, bypassing registration
    ///
    /// # Panics
    ///
    /// If the email or handle is already taken.
    pub fn insert_account(&self, data: CreateAccount, verified: bool) -> Account {
        let mut state = lock(&self.state);
        if let Err(e) = state.check_unique(&data) {
            panic!("insert_account: {}", e);
        }

        let account = new_account(data, verified);
        state.accounts.push(account.clone());
        account
    }

    /// Copy of everything committed so far
    pub fn snapshot(&self) -> Snapshot {
        lock(&self.state).clone()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn begin(&self) -> Result<Box<dyn IdentityTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: self.state.clone(),
            staged: Some(Snapshot::default()),
        }))
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        Ok(lock(&self.state).accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(lock(&self.state).accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find_account_by_email(email).await?.is_some())
    }

    async fn category_exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(lock(&self.state).categories.iter().any(|c| c.id == id))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories = lock(&self.state).categories.clone();
        categories.sort_by(|a, b| {
            (a.parent_id.is_some(), &a.name).cmp(&(b.parent_id.is_some(), &b.name))
        });
        Ok(categories)
    }

    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError> {
        let mut state = lock(&self.state);
        if state.categories.iter().any(|c| c.slug == data.slug) {
            return Err(StoreError::UniqueViolation {
                constraint: "categories_slug_key".to_string(),
            });
        }

        let category = Category {
            id: Uuid::new_v4(),
            parent_id: data.parent_id,
            name: data.name,
            slug: data.slug,
            created_at: Utc::now(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn rename_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
    ) -> Result<Option<Category>, StoreError> {
        let mut state = lock(&self.state);
        if state.categories.iter().any(|c| c.slug == slug && c.id != id) {
            return Err(StoreError::UniqueViolation {
                constraint: "categories_slug_key".to_string(),
            });
        }

        Ok(state.categories.iter_mut().find(|c| c.id == id).map(|category| {
            category.name = name.to_string();
            category.slug = slug.to_string();
            category.clone()
        }))
    }

    async fn mark_email_verified(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        let mut state = lock(&self.state);

        Ok(state.accounts.iter_mut().find(|a| a.email == email).map(|account| {
            account.email_verified_at.get_or_insert_with(Utc::now);
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, StoreError> {
        let email = normalize_email(email);
        let mut state = lock(&self.state);

        match state.accounts.iter_mut().find(|a| a.email == email) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = lock(&self.state);
        let before = state.accounts.len();

        state.accounts.retain(|a| a.id != id);
        state.profiles.retain(|p| p.account_id != id);
        state.documents.retain(|d| d.account_id != id);
        state.skills.retain(|(account_id, _)| *account_id != id);

        Ok(state.accounts.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Transaction staging writes until commit
struct MemoryTransaction {
    state: Arc<Mutex<Snapshot>>,
    staged: Option<Snapshot>,
}

impl MemoryTransaction {
    fn staged(&mut self) -> Result<&mut Snapshot, StoreError> {
        self.staged.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl IdentityTransaction for MemoryTransaction {
    async fn handle_exists(&mut self, handle: &str) -> Result<bool, StoreError> {
        let committed = lock(&self.state).accounts.iter().any(|a| a.handle == handle);
        let staged = self.staged()?.accounts.iter().any(|a| a.handle == handle);
        Ok(committed || staged)
    }

    async fn create_account(&mut self, data: CreateAccount) -> Result<Account, StoreError> {
        lock(&self.state).check_unique(&data)?;
        self.staged()?.check_unique(&data)?;

        let account = new_account(data, false);
        self.staged()?.accounts.push(account.clone());
        Ok(account)
    }

    async fn create_profile(
        &mut self,
        account_id: Uuid,
        data: CreateProfile,
    ) -> Result<Profile, StoreError> {
        let (address, bio) = match data {
            CreateProfile::Address { address } => (Some(address), None),
            CreateProfile::Bio { bio } => (None, Some(bio)),
        };

        let staged = self.staged()?;
        if staged.profiles.iter().any(|p| p.account_id == account_id) {
            return Err(StoreError::UniqueViolation {
                constraint: "profiles_account_id_key".to_string(),
            });
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            account_id,
            address,
            bio,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        staged.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn create_document(
        &mut self,
        account_id: Uuid,
        kind: DocumentKind,
        reference: &str,
    ) -> Result<Document, StoreError> {
        let document = Document {
            id: Uuid::new_v4(),
            account_id,
            kind,
            url: reference.to_string(),
            created_at: Utc::now(),
        };
        self.staged()?.documents.push(document.clone());
        Ok(document)
    }

    async fn attach_skill(&mut self, account_id: Uuid, category_id: Uuid) -> Result<(), StoreError> {
        let staged = self.staged()?;
        if !staged.skills.contains(&(account_id, category_id)) {
            staged.skills.push((account_id, category_id));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let staged = self.staged.take().ok_or(StoreError::TransactionClosed)?;
        let mut state = lock(&self.state);

        for account in &staged.accounts {
            if state.accounts.iter().any(|a| a.email == account.email) {
                return Err(StoreError::UniqueViolation {
                    constraint: "accounts_email_key".to_string(),
                });
            }
        }

        state.merge(staged);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.staged.take().ok_or(StoreError::TransactionClosed)?;
        Ok(())
    }
}

/// Token denylist held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDenylist {
    revoked: Arc<Mutex<HashMap<Uuid, DateTime<Utc>>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `revoke` fail
    pub fn fail_revocations(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }
}

#[async_trait]
impl TokenDenylist for MemoryDenylist {
    async fn revoke(&self, jti: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        if *lock(&self.failing) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        lock(&self.revoked).insert(jti, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, StoreError> {
        Ok(lock(&self.revoked).contains_key(&jti))
    }
}

#[derive(Debug, Default)]
struct OtpState {
    sent: Vec<OtpHandle>,
    /// Live code and wrong guesses so far, per destination and channel
    live: HashMap<(String, OtpChannel), (String, i32)>,
    failing: bool,
}

/// OTP Dispatcher that records codes instead of sending them
#[derive(Debug, Clone, Default)]
pub struct MemoryOtpDispatcher {
    state: Arc<Mutex<OtpState>>,
}

impl MemoryOtpDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `send` fail
    pub fn fail_deliveries(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }

    /// Every code dispatched so far, oldest first
    pub fn sent(&self) -> Vec<OtpHandle> {
        lock(&self.state).sent.clone()
    }

    /// The live email code for a destination
    pub fn last_code(&self, destination: &str) -> Option<String> {
        lock(&self.state)
            .live
            .get(&(destination.to_string(), OtpChannel::Email))
            .map(|(code, _)| code.clone())
    }
}

#[async_trait]
impl OtpDispatcher for MemoryOtpDispatcher {
    async fn send(&self, destination: &str, channel: OtpChannel) -> Result<OtpHandle, OtpError> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(OtpError::Delivery("delivery disabled".to_string()));
        }

        let handle = OtpHandle {
            id: Uuid::new_v4(),
            destination: destination.to_string(),
            channel,
            expires_at: Utc::now() + Duration::minutes(15),
        };

        state
            .live
            .insert((destination.to_string(), channel), (generate_code(DEFAULT_CODE_LENGTH), 0));
        state.sent.push(handle.clone());
        Ok(handle)
    }

    async fn verify(&self, destination: &str, channel: OtpChannel, code: &str) -> Result<bool, OtpError> {
        let mut state = lock(&self.state);
        let key = (destination.to_string(), channel);

        let Some((live, attempts)) = state.live.get_mut(&key) else {
            return Ok(false);
        };

        if *live == code.trim() {
            state.live.remove(&key);
            return Ok(true);
        }

        *attempts += 1;
        if *attempts >= MAX_ATTEMPTS {
            state.live.remove(&key);
        }
        Ok(false)
    }
}

/// File Store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `store` fail with an I/O error
    pub fn fail_writes(&self, failing: bool) {
        *lock(&self.failing) = failing;
    }

    /// Number of files currently stored
    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, reference: &str) -> bool {
        lock(&self.files).contains_key(reference)
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn store(&self, upload: &Upload, path_prefix: &str) -> Result<String, FileStoreError> {
        if *lock(&self.failing) {
            return Err(FileStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }

        if upload.is_empty() {
            return Err(FileStoreError::Empty);
        }

        let reference = match upload.extension() {
            Some(ext) => format!("{}/{}.{}", path_prefix, Uuid::new_v4(), ext),
            None => format!("{}/{}", path_prefix, Uuid::new_v4()),
        };

        lock(&self.files).insert(reference.clone(), upload.bytes.clone());
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> Result<(), FileStoreError> {
        lock(&self.files).remove(reference);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountRole;

    fn create(email: &str, handle: &str) -> CreateAccount {
        CreateAccount {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            handle: handle.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: AccountRole::User,
        }
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_rows() {
        let store = MemoryIdentityStore::new();

        let mut tx = store.begin().await.unwrap();
        let account = tx.create_account(create("ada@example.com", "ada")).await.unwrap();
        tx.create_profile(account.id, CreateProfile::Bio { bio: "hi".to_string() })
            .await
            .unwrap();
        assert!(tx.handle_exists("ada").await.unwrap());
        assert!(store.snapshot().accounts.is_empty());

        tx.rollback().await.unwrap();
        assert!(store.snapshot().accounts.is_empty());
        assert!(matches!(tx.commit().await, Err(StoreError::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_dropped_transaction_commits_nothing() {
        let store = MemoryIdentityStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_account(create("ada@example.com", "ada")).await.unwrap();
        }

        assert!(store.snapshot().accounts.is_empty());
    }

    #[tokio::test]
    async fn test_commit_enforces_email_uniqueness() {
        let store = MemoryIdentityStore::new();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.create_account(create("ada@example.com", "ada")).await.unwrap();
        second.create_account(create("ADA@example.com", "ada-1")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(err.is_unique_violation_on("email"));
        assert_eq!(store.snapshot().accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_otp_codes_are_single_use() {
        let otp = MemoryOtpDispatcher::new();
        otp.send("ada@example.com", OtpChannel::Email).await.unwrap();

        let code = otp.last_code("ada@example.com").unwrap();
        assert!(otp.verify("ada@example.com", OtpChannel::Email, &code).await.unwrap());
        assert!(!otp.verify("ada@example.com", OtpChannel::Email, &code).await.unwrap());
    }

    #[tokio::test]
    async fn test_otp_code_burnt_after_max_attempts() {
        let otp = MemoryOtpDispatcher::new();
        otp.send("ada@example.com", OtpChannel::Email).await.unwrap();
        let code = otp.last_code("ada@example.com").unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..MAX_ATTEMPTS {
            assert!(!otp.verify("ada@example.com", OtpChannel::Email, wrong).await.unwrap());
        }

        assert!(otp.last_code("ada@example.com").is_none());
        assert!(!otp.verify("ada@example.com", OtpChannel::Email, &code).await.unwrap());
    }
}
