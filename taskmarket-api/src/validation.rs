/// Request validation and the 422 error report
///
/// Validation runs in two passes: declarative rules from `validator`
/// derives ([`FieldErrors::check`]) plus confirmation matching, then
/// handler-specific checks against the Identity Store added with
/// [`FieldErrors::add`]. [`FieldErrors::finish`]
/// turns the collected errors into an [`ApiError::ValidationError`] whose
/// primary `message` is the first error of the highest-priority field, as
/// declared by the request type's [`FieldPriority`].
///
/// # Example
///
/// ```
/// use taskmarket_api::validation::{FieldErrors, FieldPriority};
/// use validator::Validate;
///
/// #[derive(Validate)]
/// struct Login {
///     #[validate(required(message = "The email field is required."))]
///     email: Option<String>,
/// }
///
/// impl FieldPriority for Login {
///     const FIELDS: &'static [&'static str] = &["email"];
/// }
///
/// let errors = FieldErrors::check(&Login { email: None });
/// let err = errors.finish::<Login>().unwrap_err();
/// assert_eq!(err.to_string(), "Validation failed: The email field is required.");
/// ```

use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;

/// Order in which fields compete for the primary error message
pub trait FieldPriority {
    const FIELDS: &'static [&'static str];
}

/// Body of a 422 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// First error by field priority
    pub message: String,

    /// Every error, by field
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    /// Report with exactly one error
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.clone()]);

        Self { message, errors }
    }

    /// Builds a report, or None if there are no errors
    pub fn build(errors: BTreeMap<String, Vec<String>>, priority: &[&str]) -> Option<Self> {
        let message = priority
            .iter()
            .filter_map(|field| errors.get(*field).and_then(|messages| messages.first()))
            .chain(errors.values().filter_map(|messages| messages.first()))
            .next()?
            .clone();

        Some(Self { message, errors })
    }
}

/// Field errors collected while validating one request
#[derive(Debug, Default, Clone)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the derived rules of `payload`
    pub fn check<T: Validate>(payload: &T) -> Self {
        let mut errors = Self::new();
        if let Err(failures) = payload.validate() {
            errors.extend(&failures);
        }
        errors
    }

    /// Adds the field errors of a `validator` result
    pub fn extend(&mut self, failures: &ValidationErrors) {
        for (field, field_errors) in failures.field_errors() {
            let field = field.to_string();
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", humanize(&field)));
                self.add(&field, message);
            }
        }
    }

    /// Confirmation rule: `<field>_confirmation` must equal `<field>`
    ///
    /// Skipped when the field itself is missing.
    pub fn confirm(&mut self, field: &str, value: Option<&str>, confirmation: Option<&str>) {
        if value.is_some() && value != confirmation {
            self.add(field, format!("The {} confirmation does not match.", humanize(field)));
        }
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    /// Whether `field` has no errors yet
    ///
    /// Store-backed checks only run on fields that passed the derived rules.
    pub fn is_clean(&self, field: &str) -> bool {
        !self.errors.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ok if nothing failed, otherwise the 422 error for `T`
    pub fn finish<T: FieldPriority>(self) -> Result<(), ApiError> {
        match ValidationReport::build(self.errors, T::FIELDS) {
            None => Ok(()),
            Some(report) => Err(ApiError::ValidationError(report)),
        }
    }
}

/// `first_name` -> `first name`
pub fn humanize(field: &str) -> String {
    field.replace('_', " ")
}

/// JSON body extractor that reports malformed JSON as 400
///
/// Field rules are not applied here; see [`FieldErrors::check`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("Expected request with `Content-Type: application/json`".to_string())
        }
        other => ApiError::BadRequest(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Signup {
        #[validate(
            required(message = "The email field is required."),
            email(message = "The email must be a valid email address.")
        )]
        email: Option<String>,

        #[validate(required(message = "The password field is required."))]
        password: Option<String>,

        password_confirmation: Option<String>,
    }

    impl FieldPriority for Signup {
        const FIELDS: &'static [&'static str] = &["email", "password"];
    }

    fn report(err: ApiError) -> ValidationReport {
        match err {
            ApiError::ValidationError(report) => report,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn check(signup: &Signup) -> FieldErrors {
        let mut errors = FieldErrors::check(signup);
        errors.confirm(
            "password",
            signup.password.as_deref(),
            signup.password_confirmation.as_deref(),
        );
        errors
    }

    #[test]
    fn test_email_error_wins_over_password_error() {
        let errors = check(&Signup {
            email: Some("not-an-email".to_string()),
            password: Some("secret123".to_string()),
            password_confirmation: Some("secret124".to_string()),
        });

        let report = report(errors.finish::<Signup>().unwrap_err());
        assert_eq!(report.message, "The email must be a valid email address.");
        assert_eq!(report.errors["email"], ["The email must be a valid email address."]);
        assert_eq!(report.errors["password"], ["The password confirmation does not match."]);
    }

    #[test]
    fn test_clean_payload_passes() {
        let errors = check(&Signup {
            email: Some("ada@example.com".to_string()),
            password: Some("secret123".to_string()),
            password_confirmation: Some("secret123".to_string()),
        });

        assert!(errors.is_empty());
        assert!(errors.finish::<Signup>().is_ok());
    }

    #[test]
    fn test_store_checks_join_the_report() {
        let mut errors = check(&Signup {
            email: Some("ada@example.com".to_string()),
            password: None,
            password_confirmation: None,
        });
        assert!(errors.is_clean("email"));
        assert!(!errors.is_clean("password"));

        errors.add("email", "The email has already been taken.");

        let report = report(errors.finish::<Signup>().unwrap_err());
        assert_eq!(report.message, "The email has already been taken.");
        assert_eq!(report.errors["password"], ["The password field is required."]);
    }

    #[test]
    fn test_unprioritized_fields_fall_back_to_key_order() {
        let mut errors = FieldErrors::new();
        errors.add("zeta", "z failed");
        errors.add("alpha", "a failed");

        let report = report(errors.finish::<Signup>().unwrap_err());
        assert_eq!(report.message, "a failed");
    }

    #[test]
    fn test_report_serializes_to_contract_shape() {
        let json = serde_json::to_value(ValidationReport::single("email", "bad")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "bad", "errors": { "email": ["bad"] } }));
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("first_name"), "first name");
    }
}
