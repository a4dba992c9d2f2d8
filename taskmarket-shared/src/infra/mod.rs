/// Production collaborator implementations
///
/// - [`identity`]: PostgreSQL Identity Store
/// - [`token`]: JWT Token Issuer with revocation
/// - [`otp`]: PostgreSQL OTP Dispatcher with pluggable delivery
/// - [`files`]: local-disk File Store

pub mod files;
pub mod identity;
pub mod otp;
pub mod token;
