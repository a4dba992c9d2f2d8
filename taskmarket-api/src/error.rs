/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`, which converts to an HTTP
/// response. Validation failures use the 422 shape
///
/// ```json
/// { "message": "The email must be a valid email address.",
///   "errors": { "email": ["The email must be a valid email address."] } }
/// ```
///
/// and every other error uses `{ "error": <code>, "message": <text> }`.
///
/// # Example
///
/// ```
/// use taskmarket_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(id: Option<u32>) -> ApiResult<Json<Value>> {
///     let id = id.ok_or_else(|| ApiError::NotFound("Nothing here".to_string()))?;
///     Ok(Json(json!({ "id": id })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::ValidationReport;
use taskmarket_shared::{
    auth::{jwt::JwtError, middleware::AuthError},
    services::{
        ports::{StoreError, TokenError},
        transaction::PaymentRejection,
        ServiceError,
    },
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Payload too large (413)
    PayloadTooLarge(String),

    /// Unprocessable entity (422)
    ValidationError(ValidationReport),

    /// Internal server error (500), details are logged, never returned
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Error body for everything except validation failures
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// 422 with a single field error
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(ValidationReport::single(field, message))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ValidationError(report) => write!(f, "Validation failed: {}", report.message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::ValidationError(report) => {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(report)).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Convert orchestrator errors to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Conflict { field, message } => ApiError::invalid(field, message),
            ServiceError::InvalidOtp => {
                ApiError::invalid("code", "The verification code is invalid or has expired.")
            }
            ServiceError::AccountNotFound => ApiError::NotFound("Account not found".to_string()),
            ServiceError::TaskNotFound => ApiError::NotFound("Task not found".to_string()),
            ServiceError::PaymentRejected(rejection) => match rejection {
                PaymentRejection::NotClient => ApiError::Forbidden(rejection.to_string()),
                PaymentRejection::NonPositiveAmount => {
                    ApiError::invalid("amount_cents", rejection.to_string())
                }
                PaymentRejection::InvalidCurrency => {
                    ApiError::invalid("currency", rejection.to_string())
                }
                PaymentRejection::TaskCancelled => ApiError::invalid("task_id", rejection.to_string()),
            },
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Convert Identity Store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Identity store failure: {}", err))
    }
}

/// Convert token validation errors to API errors
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Jwt(jwt) => jwt.into(),
            TokenError::Revoked => ApiError::Unauthorized("Token has been revoked".to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing authorization header".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert password errors to API errors
impl From<taskmarket_shared::auth::password::PasswordError> for ApiError {
    fn from(err: taskmarket_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Account not found".to_string());
        assert_eq!(err.to_string(), "Not found: Account not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::invalid("email", "taken").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::InternalError("boom".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::PayloadTooLarge("big".to_string()).into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_service_conflict_is_validation_shaped() {
        let err: ApiError = ServiceError::Conflict {
            field: "email",
            message: "The email has already been taken.".to_string(),
        }
        .into();

        match err {
            ApiError::ValidationError(report) => {
                assert_eq!(report.message, "The email has already been taken.");
                assert_eq!(report.errors["email"], ["The email has already been taken."]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_dependency_failures_are_internal() {
        let err: ApiError = ServiceError::TokenNotIssued.into();
        assert!(matches!(err, ApiError::InternalError(_)));

        let err: ApiError = ServiceError::Store(StoreError::TransactionClosed).into();
        assert!(matches!(err, ApiError::InternalError(_)));
    }

    #[test]
    fn test_missing_task_and_payment_rejections() {
        assert!(matches!(
            ApiError::from(ServiceError::TaskNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(ServiceError::PaymentRejected(PaymentRejection::NotClient)),
            ApiError::Forbidden(_)
        ));

        match ApiError::from(ServiceError::PaymentRejected(PaymentRejection::InvalidCurrency)) {
            ApiError::ValidationError(report) => assert!(report.errors.contains_key("currency")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_token_errors() {
        assert!(matches!(
            ApiError::from(TokenError::Revoked),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(TokenError::Jwt(JwtError::Expired)),
            ApiError::Unauthorized(msg) if msg == "Token expired"
        ));
    }
}
