/// Orchestration services
///
/// - [`registration`]: account onboarding as one atomic unit
/// - [`authentication`]: login, logout and account operations
/// - [`transaction`]: payment recording for tasks
/// - [`ports`]: collaborator traits the services depend on

pub mod authentication;
pub mod error;
pub mod ports;
pub mod registration;
pub mod transaction;

pub use error::ServiceError;
