/// One-time code generation and hashing
///
/// Codes are numeric, zero-padded, and drawn from the thread-local CSPRNG.
/// Only the SHA-256 hex digest of a code is persisted.
///
/// ```
/// use taskmarket_shared::auth::otp::{generate_code, hash_code, DEFAULT_CODE_LENGTH};
///
/// let code = generate_code(DEFAULT_CODE_LENGTH);
/// assert_eq!(code.len(), 6);
/// assert_eq!(hash_code(&code).len(), 64);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Generates a numeric code of `length` digits
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// SHA-256 hex digest of a code
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}
