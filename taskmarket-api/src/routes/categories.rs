/// Skill category endpoints
///
/// - `GET /v1/categories` - Every category (public)
/// - `POST /v1/categories` - Create a category (admin bearer)
/// - `PUT /v1/categories/:id` - Rename a category (admin bearer)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    validation::{FieldErrors, FieldPriority, JsonBody},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskmarket_shared::{
    auth::{handle::slugify, middleware::AuthContext},
    models::{
        account::AccountRole,
        category::{Category, CreateCategory},
    },
    services::ports::StoreError,
};
use uuid::Uuid;
use validator::Validate;

const CATEGORY_TAKEN: &str = "The category has already been taken.";

/// Category creation request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, max = 120, message = "The name must be between 1 and 120 characters.")
    )]
    pub name: Option<String>,

    /// Parent category for a sub-category
    pub parent_id: Option<String>,
}

impl FieldPriority for CreateCategoryRequest {
    const FIELDS: &'static [&'static str] = &["name", "parent_id"];
}

/// Category rename request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RenameCategoryRequest {
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, max = 120, message = "The name must be between 1 and 120 characters.")
    )]
    pub name: Option<String>,
}

impl FieldPriority for RenameCategoryRequest {
    const FIELDS: &'static [&'static str] = &["name"];
}

fn require_admin(auth: &AuthContext) -> ApiResult<()> {
    if auth.role != AccountRole::Admin {
        return Err(ApiError::Forbidden(
            "Only admins can manage categories".to_string(),
        ));
    }
    Ok(())
}

/// Trims the name and rejects one that would slug to nothing
fn check_name<'a>(errors: &mut FieldErrors, name: Option<&'a str>) -> &'a str {
    let name = name.map(str::trim).unwrap_or_default();
    if errors.is_clean("name") && !name.chars().any(|c| c.is_ascii_alphanumeric()) {
        errors.add("name", "The name must contain letters or digits.");
    }
    name
}

fn slug_conflict(component: &'static str, err: StoreError) -> ApiError {
    if err.is_unique_violation_on("slug") {
        ApiError::invalid("name", CATEGORY_TAKEN)
    } else {
        tracing::error!(component, error = %err, "Category write failed");
        ApiError::from(err)
    }
}

/// Lists every category, top-level ones first
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let categories = state.identity.list_categories().await?;
    Ok(Json(categories))
}

/// Creates a category
///
/// # Endpoint
///
/// ```text
/// POST /v1/categories
/// Authorization: Bearer <admin token>
/// Content-Type: application/json
///
/// { "name": "Leak repair", "parent_id": "3f0c..." }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller is not an admin
/// - `422 Unprocessable Entity`: Missing name, unknown parent, or the slug is taken
pub async fn create(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonBody(req): JsonBody<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    require_admin(&auth)?;

    let mut errors = FieldErrors::check(&req);
    let name = check_name(&mut errors, req.name.as_deref());

    let parent_id = match req.parent_id.as_deref().map(|raw| Uuid::parse_str(raw.trim())) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            errors.add("parent_id", "The selected parent id is invalid.");
            None
        }
        None => None,
    };

    if let Some(id) = parent_id {
        if !state.identity.category_exists(id).await? {
            errors.add("parent_id", "The selected parent id is invalid.");
        }
    }

    errors.finish::<CreateCategoryRequest>()?;

    let category = state
        .identity
        .create_category(CreateCategory {
            parent_id,
            name: name.to_string(),
            slug: slugify(name),
        })
        .await
        .map_err(|e| slug_conflict("categories::create", e))?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Renames a category
///
/// The slug follows the new name.
///
/// # Errors
///
/// - `403 Forbidden`: The caller is not an admin
/// - `404 Not Found`: No category has this ID
/// - `422 Unprocessable Entity`: Missing name, or the slug is taken
pub async fn rename(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<RenameCategoryRequest>,
) -> ApiResult<Json<Category>> {
    require_admin(&auth)?;

    let mut errors = FieldErrors::check(&req);
    let name = check_name(&mut errors, req.name.as_deref());
    errors.finish::<RenameCategoryRequest>()?;

    let category = state
        .identity
        .rename_category(id, name, &slugify(name))
        .await
        .map_err(|e| slug_conflict("categories::rename", e))?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category renamed");
    Ok(Json(category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_category_request_requires_name() {
        let req = CreateCategoryRequest::default();

        let err = FieldErrors::check(&req)
            .finish::<CreateCategoryRequest>()
            .unwrap_err();
        match err {
            ApiError::ValidationError(report) => {
                assert_eq!(report.message, "The name field is required.");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_check_name_needs_alphanumerics() {
        let mut errors = FieldErrors::new();
        assert_eq!(check_name(&mut errors, Some("  --  ")), "--");
        assert!(!errors.is_clean("name"));

        let mut errors = FieldErrors::new();
        assert_eq!(check_name(&mut errors, Some(" Leak repair ")), "Leak repair");
        assert!(errors.is_clean("name"));
    }
}
