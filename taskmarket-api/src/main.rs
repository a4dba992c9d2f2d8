//! # TaskMarket API Server
//!
//! Registration and authentication for a two-sided task marketplace:
//! clients post tasks, helpers complete them.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment
//! 2. Connect to PostgreSQL and apply migrations
//! 3. Wire the Identity Store, Token Issuer, OTP Dispatcher and File Store
//! 4. Start the periodic purge of expired codes and revocations
//! 5. Serve until Ctrl+C
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskmarket-api
//! ```

use std::sync::Arc;

use taskmarket_api::{
    app::{build_router, AppState, Collaborators},
    config::Config,
};
use taskmarket_shared::{
    db::{
        maintenance::spawn_purge_task,
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    infra::{
        files::LocalFileStore,
        identity::PgIdentityStore,
        otp::{LogDelivery, OtpDelivery, PgOtpDispatcher, WebhookDelivery},
        token::{JwtTokenIssuer, PgTokenDenylist},
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskmarket_api=debug,taskmarket_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("TaskMarket API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::new(config.database.url.clone())
    })
    .await?;
    run_migrations(&pool).await?;

    let delivery: Arc<dyn OtpDelivery> = match &config.otp.webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Delivering one-time codes through webhook");
            Arc::new(WebhookDelivery::new(url.clone()))
        }
        None => {
            tracing::warn!("OTP_WEBHOOK_URL not set, one-time codes will only be logged");
            Arc::new(LogDelivery)
        }
    };

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let collaborators = Collaborators {
        identity: Arc::new(PgIdentityStore::new(pool.clone())),
        tokens: Arc::new(JwtTokenIssuer::new(
            config.jwt.secret.clone(),
            chrono::Duration::hours(config.jwt.ttl_hours),
            Arc::new(PgTokenDenylist::new(pool.clone())),
        )),
        otp: Arc::new(PgOtpDispatcher::new(
            pool.clone(),
            chrono::Duration::minutes(config.otp.ttl_minutes),
            delivery,
        )),
        files: Arc::new(LocalFileStore::new(config.uploads.dir.clone())),
    };

    let purge = spawn_purge_task(
        pool.clone(),
        std::time::Duration::from_secs(config.database.purge_interval_secs),
    );

    let address = config.bind_address();
    let app = build_router(AppState::new(config, collaborators));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
