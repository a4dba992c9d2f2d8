/// Database models for TaskMarket
///
/// Each model owns its row type and sqlx queries. Query functions accept any
/// `PgExecutor`, so they run equally against the pool or inside a
/// registration transaction.
///
/// # Models
///
/// - `account`: registered identities with role and credentials
/// - `profile`: 1:1 role-specific profile data
/// - `document`: uploaded identity and supporting documents
/// - `category`: skill categories and helper skill associations
/// - `task`, `review`, `image`, `transaction`: marketplace records
/// - `otp_code`: one-time verification codes
/// - `revoked_token`: bearer token denylist

pub mod account;
pub mod category;
pub mod document;
pub mod image;
pub mod otp_code;
pub mod profile;
pub mod review;
pub mod revoked_token;
pub mod task;
pub mod transaction;
