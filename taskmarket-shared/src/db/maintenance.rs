/// Periodic cleanup of short-lived auth rows
///
/// Consumed or expired one-time codes and revocations of tokens past their
/// natural expiry are never read again. [`spawn_purge_task`] deletes them on
/// a fixed period for as long as the server runs.

use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;

use crate::models::{otp_code::OtpCode, revoked_token::RevokedToken};

/// Rows deleted by one purge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub otp_codes: u64,
    pub revoked_tokens: u64,
}

/// Deletes stale one-time codes and expired token revocations
pub async fn purge_stale_rows(pool: &PgPool) -> Result<PurgeReport, sqlx::Error> {
    let otp_codes = OtpCode::purge_stale(pool).await?;
    let revoked_tokens = RevokedToken::purge_expired(pool).await?;

    Ok(PurgeReport {
        otp_codes,
        revoked_tokens,
    })
}

/// Runs [`purge_stale_rows`] every `period` until the handle is aborted
///
/// The first pass runs immediately. A failed pass is logged and retried on
/// the next tick.
pub fn spawn_purge_task(pool: PgPool, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match purge_stale_rows(&pool).await {
                Ok(report) => tracing::debug!(
                    otp_codes = report.otp_codes,
                    revoked_tokens = report.revoked_tokens,
                    "Purged stale auth rows"
                ),
                Err(e) => tracing::error!(
                    component = "maintenance::purge",
                    error = %e,
                    "Stale row purge failed"
                ),
            }
        }
    })
}
