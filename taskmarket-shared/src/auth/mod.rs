/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 bearer token claims, creation and validation
/// - [`handle`]: unique public handle derivation
/// - [`otp`]: one-time code generation and hashing
/// - [`middleware`]: request authentication context
///
/// # Example
///
/// ```no_run
/// use taskmarket_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod handle;
pub mod jwt;
pub mod middleware;
pub mod otp;
pub mod password;
