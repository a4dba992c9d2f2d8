/// Collaborator interfaces consumed by the orchestrators
///
/// Production implementations live in [`crate::infra`]; in-memory ones in
/// `crate::memory` (feature `test-support`).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::{Claims, JwtError};
use crate::auth::password::PasswordError;
use crate::models::{
    account::{Account, CreateAccount},
    category::{Category, CreateCategory},
    document::{Document, DocumentKind},
    otp_code::OtpChannel,
    profile::{CreateProfile, Profile},
};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Identity Store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The transaction handle was already committed or rolled back
    #[error("Transaction already finished")]
    TransactionClosed,

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether this is a unique violation on a constraint mentioning `column`
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint.contains(column))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Persistent record of accounts and their onboarding data
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Opens a transactional scope
    ///
    /// Dropping the returned handle without calling
    /// [`IdentityTransaction::commit`] discards every write made through it.
    async fn begin(&self) -> Result<Box<dyn IdentityTransaction>, StoreError>;

    /// Case-insensitive email lookup
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn category_exists(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Every skill category, top-level ones first
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Inserts a category; a taken slug is a unique violation
    async fn create_category(&self, data: CreateCategory) -> Result<Category, StoreError>;

    /// Renames a category; None if it does not exist
    async fn rename_category(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
    ) -> Result<Option<Category>, StoreError>;

    /// Stamps `email_verified_at`; None if no account has this email
    async fn mark_email_verified(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Replaces the password hash; false if no account has this email
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, StoreError>;

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Explicit transaction handle threaded through registration steps
#[async_trait]
pub trait IdentityTransaction: Send {
    async fn handle_exists(&mut self, handle: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] on duplicate email or handle
    async fn create_account(&mut self, data: CreateAccount) -> Result<Account, StoreError>;

    async fn create_profile(
        &mut self,
        account_id: Uuid,
        data: CreateProfile,
    ) -> Result<Profile, StoreError>;

    async fn create_document(
        &mut self,
        account_id: Uuid,
        kind: DocumentKind,
        reference: &str,
    ) -> Result<Document, StoreError>;

    async fn attach_skill(&mut self, account_id: Uuid, category_id: Uuid) -> Result<(), StoreError>;

    /// Makes every write durable; the handle is closed afterwards
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards every write; the handle is closed afterwards
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Token Issuer failure
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error("Token has been revoked")]
    Revoked,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),
}

/// Issues, validates and invalidates bearer tokens
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issues a token if `password` matches the account's hash
    ///
    /// `Ok(None)` means the credentials did not match.
    async fn issue_from_credentials(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<Option<String>, TokenError>;

    /// Issues a token for an already-authenticated account
    async fn issue_from_account(&self, account: &Account) -> Result<Option<String>, TokenError>;

    /// Validates signature, expiry and revocation
    async fn validate(&self, token: &str) -> Result<Claims, TokenError>;

    /// Revokes a token until its natural expiry
    async fn invalidate(&self, token: &str) -> Result<(), TokenError>;
}

/// Receipt for a dispatched one-time code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpHandle {
    pub id: Uuid,
    pub destination: String,
    pub channel: OtpChannel,
    pub expires_at: DateTime<Utc>,
}

/// OTP Dispatcher failure
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("OTP storage error: {0}")]
    Store(#[from] StoreError),

    #[error("OTP delivery failed: {0}")]
    Delivery(String),
}

/// Generates, sends and checks one-time codes
#[async_trait]
pub trait OtpDispatcher: Send + Sync {
    async fn send(&self, destination: &str, channel: OtpChannel) -> Result<OtpHandle, OtpError>;

    /// Consumes the code if it is live and matches
    async fn verify(
        &self,
        destination: &str,
        channel: OtpChannel,
        code: &str,
    ) -> Result<bool, OtpError>;
}

/// An uploaded file held in memory
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied file name
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the client file name, if any
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// File Store failure
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Refusing to store an empty file")]
    Empty,
}

/// Persists uploaded files and returns stable references
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores the upload under `path_prefix`, returning its reference
    async fn store(&self, upload: &Upload, path_prefix: &str) -> Result<String, FileStoreError>;

    /// Deletes a previously stored file; missing files are not an error
    async fn remove(&self, reference: &str) -> Result<(), FileStoreError>;
}
