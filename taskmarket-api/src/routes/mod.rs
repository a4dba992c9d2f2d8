/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: registration, login, logout, email verification, password change
/// - `account`: the authenticated account
/// - `categories`: skill categories

pub mod account;
pub mod auth;
pub mod categories;
pub mod health;
