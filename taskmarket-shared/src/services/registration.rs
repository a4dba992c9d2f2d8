/// Registration orchestration
///
/// Registering an account touches several collaborators: the account, its
/// profile, helper documents and the skill association go through one
/// [`IdentityTransaction`]; documents are written to the [`FileStore`]; a
/// verification code goes out through the [`OtpDispatcher`]; and a bearer
/// token comes from the [`TokenIssuer`].
///
/// Either every step succeeds and the transaction commits, or the
/// transaction is rolled back, files written during the attempt are removed
/// and the first error is returned unchanged.
///
/// # Example
///
/// ```no_run
/// use taskmarket_shared::services::registration::{PlainUserInput, RegistrationService};
///
/// # async fn example(service: RegistrationService) -> Result<(), Box<dyn std::error::Error>> {
/// let result = service
///     .register_user(PlainUserInput {
///         first_name: "Ada".to_string(),
///         last_name: "Lovelace".to_string(),
///         email: "ada@example.com".to_string(),
///         password: "secret123".to_string(),
///         address: "1 Analytical Engine Way".to_string(),
///     })
///     .await?;
///
/// assert!(!result.verified);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::error::ServiceError;
use super::ports::{FileStore, IdentityStore, IdentityTransaction, OtpDispatcher, OtpHandle, TokenIssuer, Upload};
use crate::auth::{handle, password::hash_password};
use crate::models::{
    account::{normalize_email, Account, AccountRole, CreateAccount},
    document::DocumentKind,
    otp_code::OtpChannel,
    profile::CreateProfile,
};

/// Handle candidates checked before giving up
const MAX_HANDLE_ATTEMPTS: usize = 100;

/// Registration payload for a plain user (client)
#[derive(Debug, Clone)]
pub struct PlainUserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Plaintext password, already confirmed by the caller
    pub password: String,
    pub address: String,
}

/// Registration payload for a helper
#[derive(Debug, Clone)]
pub struct HelperInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    /// Skill category the helper offers
    pub category_id: Uuid,
    /// Identity document (mandatory)
    pub id_document: Upload,
    /// Supporting documents
    pub documents: Vec<Upload>,
}

/// Role-specific registration payload
#[derive(Debug, Clone)]
pub enum RegistrationInput {
    User(PlainUserInput),
    Helper(HelperInput),
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResult {
    /// Only reported for helpers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,

    pub token: String,

    pub role: AccountRole,

    /// Always false for a fresh registration
    pub verified: bool,

    pub otp: OtpHandle,
}

/// Registration Orchestrator
#[derive(Clone)]
pub struct RegistrationService {
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenIssuer>,
    otp: Arc<dyn OtpDispatcher>,
    files: Arc<dyn FileStore>,
}

impl RegistrationService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        tokens: Arc<dyn TokenIssuer>,
        otp: Arc<dyn OtpDispatcher>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            identity,
            tokens,
            otp,
            files,
        }
    }

    /// Registers either kind of account
    pub async fn register(&self, input: RegistrationInput) -> Result<RegistrationResult, ServiceError> {
        match input {
            RegistrationInput::User(input) => self.register_user(input).await,
            RegistrationInput::Helper(input) => self.register_helper(input).await,
        }
    }

    /// Registers a plain user with an address profile
    pub async fn register_user(&self, input: PlainUserInput) -> Result<RegistrationResult, ServiceError> {
        let mut tx = self.begin("RegistrationService::register_user").await?;

        let outcome = self.user_steps(tx.as_mut(), &input).await;

        self.finish(tx, outcome, Vec::new(), "RegistrationService::register_user")
            .await
    }

    /// Registers a helper with a bio profile, documents and a skill
    pub async fn register_helper(&self, input: HelperInput) -> Result<RegistrationResult, ServiceError> {
        let mut tx = self.begin("RegistrationService::register_helper").await?;

        let mut stored = Vec::new();
        let outcome = self.helper_steps(tx.as_mut(), &input, &mut stored).await;

        self.finish(tx, outcome, stored, "RegistrationService::register_helper")
            .await
    }

    async fn begin(&self, component: &'static str) -> Result<Box<dyn IdentityTransaction>, ServiceError> {
        self.identity.begin().await.map_err(|e| {
            tracing::error!(component, error = %e, "Failed to open registration transaction");
            ServiceError::Store(e)
        })
    }

    async fn user_steps(
        &self,
        tx: &mut dyn IdentityTransaction,
        input: &PlainUserInput,
    ) -> Result<RegistrationResult, ServiceError> {
        let account = create_account(
            tx,
            &input.first_name,
            &input.last_name,
            &input.email,
            &input.password,
            AccountRole::User,
        )
        .await?;

        tx.create_profile(
            account.id,
            CreateProfile::Address {
                address: input.address.clone(),
            },
        )
        .await
        .map_err(ServiceError::from_store)?;

        let (token, otp) = self.dispatch_and_issue(&account, &input.password).await?;

        Ok(RegistrationResult {
            account_id: None,
            token,
            role: account.role,
            verified: false,
            otp,
        })
    }

    async fn helper_steps(
        &self,
        tx: &mut dyn IdentityTransaction,
        input: &HelperInput,
        stored: &mut Vec<String>,
    ) -> Result<RegistrationResult, ServiceError> {
        let account = create_account(
            tx,
            &input.first_name,
            &input.last_name,
            &input.email,
            &input.password,
            AccountRole::Helper,
        )
        .await?;

        tx.create_profile(account.id, CreateProfile::Bio { bio: input.bio.clone() })
            .await
            .map_err(ServiceError::from_store)?;

        let id_reference = self
            .store_file(&input.id_document, DocumentKind::Id, account.id, stored)
            .await?;
        tx.create_document(account.id, DocumentKind::Id, &id_reference)
            .await
            .map_err(ServiceError::from_store)?;

        for document in &input.documents {
            let reference = self
                .store_file(document, DocumentKind::Document, account.id, stored)
                .await?;
            tx.create_document(account.id, DocumentKind::Document, &reference)
                .await
                .map_err(ServiceError::from_store)?;
        }

        tx.attach_skill(account.id, input.category_id)
            .await
            .map_err(ServiceError::from_store)?;

        let (token, otp) = self.dispatch_and_issue(&account, &input.password).await?;

        Ok(RegistrationResult {
            account_id: Some(account.id),
            token,
            role: account.role,
            verified: false,
            otp,
        })
    }

    async fn store_file(
        &self,
        upload: &Upload,
        kind: DocumentKind,
        account_id: Uuid,
        stored: &mut Vec<String>,
    ) -> Result<String, ServiceError> {
        let reference = self.files.store(upload, &kind.path_prefix(account_id)).await?;
        stored.push(reference.clone());
        Ok(reference)
    }

    async fn dispatch_and_issue(
        &self,
        account: &Account,
        password: &str,
    ) -> Result<(String, OtpHandle), ServiceError> {
        let otp = self.otp.send(&account.email, OtpChannel::Email).await?;

        let token = self
            .tokens
            .issue_from_credentials(account, password)
            .await?
            .ok_or(ServiceError::TokenNotIssued)?;

        Ok((token, otp))
    }

    /// Commits on success; otherwise rolls back and removes stored files
    async fn finish(
        &self,
        mut tx: Box<dyn IdentityTransaction>,
        outcome: Result<RegistrationResult, ServiceError>,
        stored: Vec<String>,
        component: &'static str,
    ) -> Result<RegistrationResult, ServiceError> {
        let result = match outcome {
            Ok(result) => tx.commit().await.map(|()| result).map_err(ServiceError::from_store),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(component, error = %rollback_err, "Explicit rollback failed");
                }
                Err(err)
            }
        };

        match result {
            Ok(result) => {
                tracing::info!(
                    component,
                    role = %result.role,
                    otp_id = %result.otp.id,
                    "Account registered"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::error!(component, error = %err, "Registration failed, rolled back");

                for reference in &stored {
                    if let Err(e) = self.files.remove(reference).await {
                        tracing::warn!(component, reference = %reference, error = %e, "Failed to remove orphaned upload");
                    }
                }

                Err(err)
            }
        }
    }
}

async fn create_account(
    tx: &mut dyn IdentityTransaction,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    role: AccountRole,
) -> Result<Account, ServiceError> {
    let handle = unique_handle(tx, first_name).await?;
    let password_hash = hash_password(password)?;

    tx.create_account(CreateAccount {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        handle,
        email: normalize_email(email),
        password_hash,
        role,
    })
    .await
    .map_err(ServiceError::from_store)
}

/// First handle candidate not yet taken, checked inside the transaction
async fn unique_handle(tx: &mut dyn IdentityTransaction, first_name: &str) -> Result<String, ServiceError> {
    for candidate in handle::candidates(first_name).take(MAX_HANDLE_ATTEMPTS) {
        if !tx.handle_exists(&candidate).await.map_err(ServiceError::from_store)? {
            return Ok(candidate);
        }
    }

    Err(ServiceError::Conflict {
        field: "handle",
        message: "Could not allocate a unique handle.".to_string(),
    })
}
