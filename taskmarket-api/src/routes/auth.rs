/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a plain user (JSON)
/// - `POST /v1/auth/register/helper` - Register a helper (multipart)
/// - `POST /v1/auth/login` - Login and get a token
/// - `POST /v1/auth/logout` - Invalidate the bearer token
/// - `POST /v1/auth/verify-email` - Confirm the email with a one-time code
/// - `POST /v1/auth/resend-otp` - Send a new one-time code
/// - `POST /v1/auth/password/code` - Send a password reset code
/// - `POST /v1/auth/password` - Change the password with a reset code
///
/// Every request is validated before it reaches an orchestrator. Failures
/// are reported as 422 with the first error of the highest-priority field as
/// the `message`.

use crate::{
    app::{AppState, MAX_DOCUMENTS},
    error::{ApiError, ApiResult},
    validation::{humanize, FieldErrors, FieldPriority, JsonBody},
};
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taskmarket_shared::{
    auth::{middleware::AuthContext, password},
    services::{
        authentication::{AccountSummary, LoginResult},
        error::EMAIL_TAKEN,
        ports::{OtpHandle, Upload},
        registration::{HelperInput, PlainUserInput, RegistrationResult},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Extensions accepted for identity and supporting documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

const UNKNOWN_EMAIL: &str = "The selected email is invalid.";

const UNREGISTERED_EMAIL: &str = "This email address is not registered in our system.";

/// Plain user registration request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "The first name field is required."),
        length(min = 1, max = 100, message = "The first name must be between 1 and 100 characters.")
    )]
    pub first_name: Option<String>,

    #[validate(
        required(message = "The last name field is required."),
        length(min = 1, max = 100, message = "The last name must be between 1 and 100 characters.")
    )]
    pub last_name: Option<String>,

    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password must be at least 8 characters.")
    )]
    pub password: Option<String>,

    pub password_confirmation: Option<String>,

    #[validate(
        required(message = "The address field is required."),
        length(min = 1, max = 255, message = "The address must be between 1 and 255 characters.")
    )]
    pub address: Option<String>,
}

impl FieldPriority for RegisterRequest {
    const FIELDS: &'static [&'static str] =
        &["first_name", "last_name", "email", "password", "address"];
}

impl RegisterRequest {
    fn into_input(self) -> PlainUserInput {
        PlainUserInput {
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
        }
    }
}

/// Helper registration form, read from multipart fields
#[derive(Debug, Default, Validate)]
pub struct HelperForm {
    #[validate(
        required(message = "The first name field is required."),
        length(min = 1, max = 100, message = "The first name must be between 1 and 100 characters.")
    )]
    pub first_name: Option<String>,

    #[validate(
        required(message = "The last name field is required."),
        length(min = 1, max = 100, message = "The last name must be between 1 and 100 characters.")
    )]
    pub last_name: Option<String>,

    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password must be at least 8 characters.")
    )]
    pub password: Option<String>,

    pub password_confirmation: Option<String>,

    #[validate(
        required(message = "The bio field is required."),
        length(min = 1, max = 2000, message = "The bio must be between 1 and 2000 characters.")
    )]
    pub bio: Option<String>,

    #[validate(required(message = "The category id field is required."))]
    pub category_id: Option<String>,

    /// Identity document (`id` part)
    pub id: Option<Upload>,

    /// Supporting documents (`documents` or `documents[]` parts)
    pub documents: Vec<Upload>,
}

impl FieldPriority for HelperForm {
    const FIELDS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "email",
        "password",
        "bio",
        "category_id",
        "id",
        "documents",
    ];
}

impl HelperForm {
    /// Stores a text part; unknown names are ignored
    fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            "email" => &mut self.email,
            "password" => &mut self.password,
            "password_confirmation" => &mut self.password_confirmation,
            "bio" => &mut self.bio,
            "category_id" => &mut self.category_id,
            _ => return,
        };
        *slot = Some(value);
    }

    fn into_input(self, category_id: Uuid, id_document: Upload) -> HelperInput {
        HelperInput {
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
            category_id,
            id_document,
            documents: self.documents,
        }
    }
}

/// Login request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(required(message = "The password field is required."))]
    pub password: Option<String>,
}

impl FieldPriority for LoginRequest {
    const FIELDS: &'static [&'static str] = &["email", "password"];
}

/// Email verification request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The code field is required."),
        length(min = 4, max = 12, message = "The code must be between 4 and 12 characters.")
    )]
    pub code: Option<String>,
}

impl FieldPriority for VerifyEmailRequest {
    const FIELDS: &'static [&'static str] = &["email", "code"];
}

/// Code resend request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    pub email: Option<String>,
}

impl FieldPriority for ResendOtpRequest {
    const FIELDS: &'static [&'static str] = &["email"];
}

/// Password change request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PasswordChangeRequest {
    #[validate(
        required(message = "Email field is required."),
        email(message = "Please provide a valid email address.")
    )]
    pub email: Option<String>,

    /// Reset code sent by `POST /v1/auth/password/code`
    #[validate(
        required(message = "The code field is required."),
        length(min = 4, max = 12, message = "The code must be between 4 and 12 characters.")
    )]
    pub code: Option<String>,

    #[validate(
        required(message = "Password is required."),
        length(min = 8, message = "The password must be at least 8 characters.")
    )]
    pub password: Option<String>,

    pub password_confirmation: Option<String>,
}

impl FieldPriority for PasswordChangeRequest {
    const FIELDS: &'static [&'static str] = &["email", "code", "password"];
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Adds an `email` error if the address is already registered
async fn check_email_unused(
    state: &AppState,
    errors: &mut FieldErrors,
    email: Option<&str>,
) -> ApiResult<()> {
    if let Some(email) = email.filter(|_| errors.is_clean("email")) {
        if state.identity.email_exists(email).await? {
            errors.add("email", EMAIL_TAKEN);
        }
    }
    Ok(())
}

/// Adds an `email` error unless the address is registered
async fn check_email_registered(
    state: &AppState,
    errors: &mut FieldErrors,
    email: Option<&str>,
    message: &str,
) -> ApiResult<()> {
    if let Some(email) = email.filter(|_| errors.is_clean("email")) {
        if !state.identity.email_exists(email).await? {
            errors.add("email", message);
        }
    }
    Ok(())
}

/// Validates an uploaded document against type and size rules
fn check_upload(errors: &mut FieldErrors, field: &str, upload: &Upload, max_bytes: usize) {
    let name = humanize(field);

    if upload.is_empty() {
        errors.add(field, format!("The {} failed to upload.", name));
        return;
    }

    let allowed = upload
        .extension()
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !allowed {
        errors.add(
            field,
            format!("The {} must be a file of type: {}.", name, DOCUMENT_EXTENSIONS.join(", ")),
        );
    }

    if upload.len() > max_bytes {
        errors.add(
            field,
            format!("The {} must not be greater than {} kilobytes.", name, max_bytes / 1024),
        );
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn read_upload(field: Field<'_>) -> ApiResult<Upload> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    Ok(Upload {
        file_name,
        content_type,
        bytes,
    })
}

/// Reads the helper form from a multipart body
async fn read_helper_form(mut multipart: Multipart) -> ApiResult<HelperForm> {
    let mut form = HelperForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "id" => form.id = Some(read_upload(field).await?),
            "documents" | "documents[]" => form.documents.push(read_upload(field).await?),
            _ => {
                let value = field.text().await.map_err(multipart_error)?;
                form.set_text(&name, value);
            }
        }
    }

    Ok(form)
}

/// Register a plain user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "email": "ada@example.com",
///   "password": "analytical",
///   "password_confirmation": "analytical",
///   "address": "12 St James's Square, London"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "token": "eyJ...",
///   "role": "user",
///   "verified": false,
///   "otp": { "id": "uuid", "destination": "ada@example.com", "channel": "email", "expires_at": "..." }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON
/// - `422 Unprocessable Entity`: Validation failed or email taken
/// - `500 Internal Server Error`: A collaborator failed
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationResult>)> {
    let mut errors = FieldErrors::check(&req);
    errors.confirm(
        "password",
        req.password.as_deref(),
        req.password_confirmation.as_deref(),
    );
    check_email_unused(&state, &mut errors, req.email.as_deref()).await?;
    errors.finish::<RegisterRequest>()?;

    let result = state.registration.register_user(req.into_input()).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Register a helper
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register/helper
/// Content-Type: multipart/form-data
///
/// first_name, last_name, email, password, password_confirmation, bio,
/// category_id (text parts)
/// id (file, required), documents / documents[] (files, optional)
/// ```
///
/// Files must be pdf, jpg, jpeg or png and no larger than the configured
/// upload limit.
///
/// # Response (201)
///
/// Same bundle as [`register`] plus `account_id`.
pub async fn register_helper(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<RegistrationResult>)> {
    let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let form = read_helper_form(multipart).await?;
    let max_bytes = state.config.uploads.max_bytes;

    let mut errors = FieldErrors::check(&form);
    errors.confirm(
        "password",
        form.password.as_deref(),
        form.password_confirmation.as_deref(),
    );

    let category_id = match form.category_id.as_deref().map(|raw| Uuid::parse_str(raw.trim())) {
        Some(Ok(id)) => Some(id),
        Some(Err(_)) => {
            errors.add("category_id", "The selected category id is invalid.");
            None
        }
        None => None,
    };

    match &form.id {
        Some(upload) => check_upload(&mut errors, "id", upload, max_bytes),
        None => errors.add("id", "The id field is required."),
    }

    if form.documents.len() > MAX_DOCUMENTS {
        errors.add(
            "documents",
            format!("The documents must not have more than {} items.", MAX_DOCUMENTS),
        );
    }
    for document in &form.documents {
        check_upload(&mut errors, "documents", document, max_bytes);
    }

    check_email_unused(&state, &mut errors, form.email.as_deref()).await?;

    if let Some(id) = category_id {
        if !state.identity.category_exists(id).await? {
            errors.add("category_id", "The selected category id is invalid.");
        }
    }

    errors.finish::<HelperForm>()?;

    let (category_id, id_document) = match (category_id, form.id.clone()) {
        (Some(category_id), Some(id_document)) => (category_id, id_document),
        _ => return Err(ApiError::invalid("id", "The id field is required.")),
    };

    let result = state
        .registration
        .register_helper(form.into_input(category_id, id_document))
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// { "email": "ada@example.com", "password": "analytical" }
/// ```
///
/// # Response
///
/// ```json
/// { "account_id": "uuid", "token": "eyJ...", "role": "user", "verified": false }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResult>> {
    let mut errors = FieldErrors::check(&req);

    if let (Some(email), true) = (req.email.as_deref(), errors.is_clean("email")) {
        match state.identity.find_account_by_email(email).await? {
            None => errors.add("email", UNKNOWN_EMAIL),
            Some(account) => {
                if let Some(plain) = req.password.as_deref() {
                    if !password::verify_password(plain, &account.password_hash)? {
                        errors.add("password", "The provided password is incorrect.");
                    }
                }
            }
        }
    }

    errors.finish::<LoginRequest>()?;

    let result = state
        .authentication
        .login(req.email.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(result))
}

/// Logout endpoint (bearer)
///
/// Revokes the token used to authenticate this request.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MessageResponse>> {
    state.authentication.logout(&auth).await?;

    Ok(MessageResponse::new("Successfully logged out."))
}

/// Confirms the email address with a one-time code
///
/// # Response
///
/// The account summary, with `verified: true`.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown email, or the code is wrong or expired
pub async fn verify_email(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyEmailRequest>,
) -> ApiResult<Json<AccountSummary>> {
    let mut errors = FieldErrors::check(&req);
    check_email_registered(&state, &mut errors, req.email.as_deref(), UNKNOWN_EMAIL).await?;
    errors.finish::<VerifyEmailRequest>()?;

    let account = state
        .authentication
        .verify_email(
            req.email.as_deref().unwrap_or_default(),
            req.code.as_deref().unwrap_or_default().trim(),
        )
        .await?;

    Ok(Json(account))
}

/// Sends a fresh one-time code to an unverified account
///
/// Earlier codes for the same address stop working.
pub async fn resend_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendOtpRequest>,
) -> ApiResult<Json<OtpHandle>> {
    let mut errors = FieldErrors::check(&req);
    check_email_registered(&state, &mut errors, req.email.as_deref(), UNKNOWN_EMAIL).await?;
    errors.finish::<ResendOtpRequest>()?;

    let handle = state
        .authentication
        .resend_otp(req.email.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(handle))
}

/// Sends a password reset code to a registered account
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/password/code
/// Content-Type: application/json
///
/// { "email": "ada@example.com" }
/// ```
pub async fn request_password_reset(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendOtpRequest>,
) -> ApiResult<Json<OtpHandle>> {
    let mut errors = FieldErrors::check(&req);
    check_email_registered(&state, &mut errors, req.email.as_deref(), UNREGISTERED_EMAIL).await?;
    errors.finish::<ResendOtpRequest>()?;

    let handle = state
        .authentication
        .request_password_reset(req.email.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(handle))
}

/// Changes the password of a registered account
///
/// The caller proves ownership of the address with the code sent by
/// [`request_password_reset`].
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/password
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "code": "483920",
///   "password": "difference",
///   "password_confirmation": "difference"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Unknown email, mismatched passwords, or the
///   code is wrong or expired
pub async fn change_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PasswordChangeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let mut errors = FieldErrors::check(&req);
    if req.password.is_some() && req.password != req.password_confirmation {
        errors.add("password", "Passwords do not match.");
    }
    check_email_registered(&state, &mut errors, req.email.as_deref(), UNREGISTERED_EMAIL).await?;
    errors.finish::<PasswordChangeRequest>()?;

    state
        .authentication
        .change_password(
            req.email.as_deref().unwrap_or_default(),
            req.code.as_deref().unwrap_or_default().trim(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(MessageResponse::new("Password changed successfully."))
}
