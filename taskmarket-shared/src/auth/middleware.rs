/// Request authentication context
///
/// The API's JWT layer validates the `Authorization: Bearer <token>` header
/// and inserts an [`AuthContext`] into the request extensions. Handlers take
/// `AuthContext` as an extractor; it carries the raw token so that logout
/// can invalidate exactly the token the caller presented.
///
/// # Example
///
/// ```
/// use taskmarket_shared::auth::middleware::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, {} {}!", auth.role, auth.account_id)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::jwt::Claims;
use crate::models::account::AccountRole;

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: Uuid,

    pub role: AccountRole,

    /// Token ID of the presented token
    pub jti: Uuid,

    /// The bearer token as presented
    pub token: String,
}

impl AuthContext {
    /// Creates auth context from validated claims and the raw token
    pub fn from_claims(claims: &Claims, token: impl Into<String>) -> Self {
        Self {
            account_id: claims.sub,
            role: claims.role,
            jti: claims.jti,
            token: token.into(),
        }
    }
}

/// Error type for request authentication
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token failed validation or was revoked
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
        }
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_errors() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingCredentials));
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_auth_context_from_claims() {
        let claims = Claims::new(Uuid::new_v4(), AccountRole::Helper, Duration::hours(1));
        let context = AuthContext::from_claims(&claims, "token");

        assert_eq!(context.account_id, claims.sub);
        assert_eq!(context.role, AccountRole::Helper);
        assert_eq!(context.jti, claims.jti);
        assert_eq!(context.token, "token");
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat("test".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidToken("test".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
