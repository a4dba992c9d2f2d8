/// Service error taxonomy

use crate::auth::password::PasswordError;

use super::ports::{FileStoreError, OtpError, StoreError, TokenError};
use super::transaction::PaymentRejection;

/// Message reported when an email is already registered
pub const EMAIL_TAKEN: &str = "The email has already been taken.";

/// Error returned by the orchestrators
///
/// Orchestrators log failures and return them unchanged; the HTTP layer
/// decides how each variant is presented.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A uniqueness rule rejected the input
    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// The Token Issuer declined to issue a token
    #[error("Token could not be issued")]
    TokenNotIssued,

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    File(#[from] FileStoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// No account matches the given identifier
    #[error("Account not found")]
    AccountNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid or expired verification code")]
    InvalidOtp,

    /// No task matches the given identifier
    #[error("Task not found")]
    TaskNotFound,

    #[error(transparent)]
    PaymentRejected(#[from] PaymentRejection),
}

impl ServiceError {
    /// Maps store uniqueness violations on email or handle to [`ServiceError::Conflict`]
    pub fn from_store(err: StoreError) -> Self {
        if err.is_unique_violation_on("email") {
            ServiceError::Conflict {
                field: "email",
                message: EMAIL_TAKEN.to_string(),
            }
        } else if err.is_unique_violation_on("handle") {
            ServiceError::Conflict {
                field: "handle",
                message: "The handle has already been taken.".to_string(),
            }
        } else {
            ServiceError::Store(err)
        }
    }
}
