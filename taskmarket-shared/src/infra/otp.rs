/// OTP Dispatcher backed by PostgreSQL
///
/// Codes are generated with [`crate::auth::otp::generate_code`], stored as
/// SHA-256 hashes in `otp_codes` and handed to an [`OtpDelivery`] for
/// sending. Issuing a new code for a destination supersedes any earlier
/// live code for it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::otp::{generate_code, hash_code, DEFAULT_CODE_LENGTH};
use crate::models::otp_code::{OtpChannel, OtpCode};
use crate::services::ports::{OtpDispatcher, OtpError, OtpHandle, StoreError};

/// Default code lifetime
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 15;

/// Sends a plaintext code to its destination
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, destination: &str, channel: OtpChannel, code: &str) -> Result<(), OtpError>;
}

/// Writes codes to the log instead of sending them
///
/// Used in development when no mail relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogDelivery;

#[async_trait]
impl OtpDelivery for LogDelivery {
    async fn deliver(&self, destination: &str, channel: OtpChannel, code: &str) -> Result<(), OtpError> {
        tracing::info!(
            destination = %destination,
            channel = channel.as_str(),
            code = %code,
            "OTP delivery (log only)"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    to: &'a str,
    channel: OtpChannel,
    subject: &'a str,
    code: &'a str,
}

/// POSTs codes as JSON to a mail/SMS relay
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    client: Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl OtpDelivery for WebhookDelivery {
    async fn deliver(&self, destination: &str, channel: OtpChannel, code: &str) -> Result<(), OtpError> {
        let message = WebhookMessage {
            to: destination,
            channel,
            subject: "Your verification code",
            code,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| OtpError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(destination = %destination, status = %status, "OTP relay rejected message");
            return Err(OtpError::Delivery(format!("Relay responded with {}", status)));
        }

        Ok(())
    }
}

/// OTP Dispatcher storing hashed codes in PostgreSQL
pub struct PgOtpDispatcher {
    pool: PgPool,
    ttl: Duration,
    delivery: Arc<dyn OtpDelivery>,
}

impl PgOtpDispatcher {
    pub fn new(pool: PgPool, ttl: Duration, delivery: Arc<dyn OtpDelivery>) -> Self {
        Self { pool, ttl, delivery }
    }
}

#[async_trait]
impl OtpDispatcher for PgOtpDispatcher {
    async fn send(&self, destination: &str, channel: OtpChannel) -> Result<OtpHandle, OtpError> {
        let code = generate_code(DEFAULT_CODE_LENGTH);
        let expires_at = Utc::now() + self.ttl;

        let record = OtpCode::create(&self.pool, destination, channel, &hash_code(&code), expires_at)
            .await
            .map_err(StoreError::from)?;

        self.delivery.deliver(destination, channel, &code).await?;

        Ok(OtpHandle {
            id: record.id,
            destination: record.destination,
            channel: record.channel,
            expires_at: record.expires_at,
        })
    }

    async fn verify(&self, destination: &str, channel: OtpChannel, code: &str) -> Result<bool, OtpError> {
        let consumed = OtpCode::consume(&self.pool, destination, channel, &hash_code(code))
            .await
            .map_err(StoreError::from)?;

        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_message_shape() {
        let message = WebhookMessage {
            to: "ada@example.com",
            channel: OtpChannel::Email,
            subject: "Your verification code",
            code: "123456",
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["to"], "ada@example.com");
        assert_eq!(json["channel"], "email");
        assert_eq!(json["code"], "123456");
    }

    #[tokio::test]
    async fn test_log_delivery_succeeds() {
        assert!(LogDelivery
            .deliver("ada@example.com", OtpChannel::Email, "123456")
            .await
            .is_ok());
    }
}
