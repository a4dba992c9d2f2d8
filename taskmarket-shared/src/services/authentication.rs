/// Authentication orchestration
///
/// Login, logout and the account operations around them. Password checks
/// happen at the HTTP boundary before [`AuthenticationService::login`] is
/// called; this layer only resolves the account and issues the token.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::error::ServiceError;
use super::ports::{IdentityStore, OtpDispatcher, OtpHandle, StoreError, TokenIssuer};
use crate::auth::{middleware::AuthContext, password::hash_password};
use crate::models::{
    account::{normalize_email, Account, AccountRole},
    otp_code::OtpChannel,
};

/// Outcome of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub account_id: Uuid,
    pub token: String,
    pub role: AccountRole,
    /// True iff the account email has been confirmed
    pub verified: bool,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub handle: String,
    pub email: String,
    pub role: AccountRole,
    pub verified: bool,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        let verified = account.is_verified();
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            handle: account.handle,
            email: account.email,
            role: account.role,
            verified,
        }
    }
}

/// Authentication Orchestrator
#[derive(Clone)]
pub struct AuthenticationService {
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenIssuer>,
    otp: Arc<dyn OtpDispatcher>,
}

impl AuthenticationService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        tokens: Arc<dyn TokenIssuer>,
        otp: Arc<dyn OtpDispatcher>,
    ) -> Self {
        Self {
            identity,
            tokens,
            otp,
        }
    }

    /// Issues a token for the account with this email
    ///
    /// # Errors
    ///
    /// - [`ServiceError::AccountNotFound`] if no account has this email
    /// - [`ServiceError::TokenNotIssued`] if the issuer declines
    pub async fn login(&self, email: &str) -> Result<LoginResult, ServiceError> {
        let account = self
            .identity
            .find_account_by_email(email)
            .await
            .map_err(|e| store_failure("AuthenticationService::login", e))?
            .ok_or_else(|| {
                tracing::warn!(component = "AuthenticationService::login", "Login for unknown email");
                ServiceError::AccountNotFound
            })?;

        let token = match self.tokens.issue_from_account(&account).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::error!(
                    component = "AuthenticationService::login",
                    account_id = %account.id,
                    "Token issuer declined to issue a token"
                );
                return Err(ServiceError::TokenNotIssued);
            }
            Err(e) => {
                tracing::error!(
                    component = "AuthenticationService::login",
                    account_id = %account.id,
                    error = %e,
                    "Token issuance failed"
                );
                return Err(e.into());
            }
        };

        tracing::info!(account_id = %account.id, role = %account.role, "Account logged in");

        Ok(LoginResult {
            account_id: account.id,
            token,
            role: account.role,
            verified: account.is_verified(),
        })
    }

    /// Invalidates the token the caller authenticated with
    pub async fn logout(&self, auth: &AuthContext) -> Result<(), ServiceError> {
        self.tokens.invalidate(&auth.token).await.map_err(|e| {
            tracing::error!(
                component = "AuthenticationService::logout",
                account_id = %auth.account_id,
                error = %e,
                "Token invalidation failed"
            );
            ServiceError::from(e)
        })?;

        tracing::info!(account_id = %auth.account_id, jti = %auth.jti, "Account logged out");
        Ok(())
    }

    /// Confirms an email address with a one-time code
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<AccountSummary, ServiceError> {
        let email = normalize_email(email);

        if !self.check_code(&email, code, "AuthenticationService::verify_email").await? {
            return Err(ServiceError::InvalidOtp);
        }

        let account = self
            .identity
            .mark_email_verified(&email)
            .await
            .map_err(|e| store_failure("AuthenticationService::verify_email", e))?
            .ok_or(ServiceError::AccountNotFound)?;

        tracing::info!(account_id = %account.id, "Email verified");
        Ok(account.into())
    }

    /// Sends a fresh code to an account's email
    pub async fn resend_otp(&self, email: &str) -> Result<OtpHandle, ServiceError> {
        let account = self
            .identity
            .find_account_by_email(email)
            .await
            .map_err(|e| store_failure("AuthenticationService::resend_otp", e))?
            .ok_or(ServiceError::AccountNotFound)?;

        if account.is_verified() {
            return Err(ServiceError::Conflict {
                field: "email",
                message: "The email has already been verified.".to_string(),
            });
        }

        self.dispatch_code(&account, "AuthenticationService::resend_otp").await
    }

    /// Sends a password reset code to an account's email
    ///
    /// Unlike [`Self::resend_otp`] this works for verified accounts too.
    pub async fn request_password_reset(&self, email: &str) -> Result<OtpHandle, ServiceError> {
        let account = self
            .identity
            .find_account_by_email(email)
            .await
            .map_err(|e| store_failure("AuthenticationService::request_password_reset", e))?
            .ok_or(ServiceError::AccountNotFound)?;

        let handle = self
            .dispatch_code(&account, "AuthenticationService::request_password_reset")
            .await?;

        tracing::info!(account_id = %account.id, "Password reset code sent");
        Ok(handle)
    }

    /// Replaces the password of the account with this email
    ///
    /// The code must come from [`Self::request_password_reset`] (or any
    /// other live email code for the account). It is consumed on success.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidOtp`] if the code does not match
    /// - [`ServiceError::AccountNotFound`] if no account has this email
    pub async fn change_password(
        &self,
        email: &str,
        code: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        let email = normalize_email(email);

        if !self.check_code(&email, code, "AuthenticationService::change_password").await? {
            tracing::warn!(
                component = "AuthenticationService::change_password",
                "Password change with invalid code"
            );
            return Err(ServiceError::InvalidOtp);
        }

        let password_hash = hash_password(password)?;

        let updated = self
            .identity
            .update_password(&email, &password_hash)
            .await
            .map_err(|e| store_failure("AuthenticationService::change_password", e))?;

        if !updated {
            return Err(ServiceError::AccountNotFound);
        }

        tracing::info!(component = "AuthenticationService::change_password", "Password changed");
        Ok(())
    }

    /// Deletes the caller's own account and invalidates their token
    ///
    /// Admin accounts cannot delete themselves. The token is revoked first;
    /// if that fails the account is left intact.
    pub async fn delete_account(&self, auth: &AuthContext) -> Result<(), ServiceError> {
        if !auth.role.can_self_delete() {
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be deleted".to_string(),
            ));
        }

        self.tokens.invalidate(&auth.token).await.map_err(|e| {
            tracing::error!(
                component = "AuthenticationService::delete_account",
                account_id = %auth.account_id,
                error = %e,
                "Token invalidation failed"
            );
            ServiceError::from(e)
        })?;

        let deleted = self
            .identity
            .delete_account(auth.account_id)
            .await
            .map_err(|e| store_failure("AuthenticationService::delete_account", e))?;

        if !deleted {
            return Err(ServiceError::AccountNotFound);
        }

        tracing::info!(account_id = %auth.account_id, "Account deleted");
        Ok(())
    }

    async fn check_code(
        &self,
        email: &str,
        code: &str,
        component: &'static str,
    ) -> Result<bool, ServiceError> {
        self.otp.verify(email, OtpChannel::Email, code).await.map_err(|e| {
            tracing::error!(component, error = %e, "Code verification failed");
            ServiceError::from(e)
        })
    }

    async fn dispatch_code(
        &self,
        account: &Account,
        component: &'static str,
    ) -> Result<OtpHandle, ServiceError> {
        self.otp.send(&account.email, OtpChannel::Email).await.map_err(|e| {
            tracing::error!(component, account_id = %account.id, error = %e, "Code dispatch failed");
            ServiceError::from(e)
        })
    }

    /// Current account of the caller
    pub async fn me(&self, account_id: Uuid) -> Result<AccountSummary, ServiceError> {
        self.identity
            .find_account_by_id(account_id)
            .await
            .map_err(|e| store_failure("AuthenticationService::me", e))?
            .map(AccountSummary::from)
            .ok_or(ServiceError::AccountNotFound)
    }
}

fn store_failure(component: &'static str, err: StoreError) -> ServiceError {
    tracing::error!(component, error = %err, "Identity store failure");
    ServiceError::Store(err)
}
