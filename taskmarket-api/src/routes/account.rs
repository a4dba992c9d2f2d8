/// Endpoints for the authenticated account
///
/// - `GET /v1/account/me` - Account summary
/// - `DELETE /v1/account` - Delete the account and revoke the token
///
/// Both require a bearer token.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use taskmarket_shared::{auth::middleware::AuthContext, services::authentication::AccountSummary};

/// Returns the caller's account
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<AccountSummary>> {
    let account = state.authentication.me(auth.account_id).await?;
    Ok(Json(account))
}

/// Deletes the caller's account
///
/// # Errors
///
/// - `403 Forbidden`: Admin accounts cannot delete themselves
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<StatusCode> {
    state.authentication.delete_account(&auth).await?;
    Ok(StatusCode::NO_CONTENT)
}
