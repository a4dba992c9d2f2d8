//! # TaskMarket API Server Library
//!
//! HTTP surface for marketplace registration and authentication.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `validation`: Request validation and the 422 report

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod validation;
