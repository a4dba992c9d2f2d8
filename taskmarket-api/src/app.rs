/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmarket_api::{app::{AppState, Collaborators}, config::Config};
/// use taskmarket_shared::infra::{
///     files::LocalFileStore,
///     identity::PgIdentityStore,
///     otp::{LogDelivery, PgOtpDispatcher},
///     token::{JwtTokenIssuer, PgTokenDenylist},
/// };
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = sqlx::PgPool::connect(&config.database.url).await?;
/// let collaborators = Collaborators {
///     identity: Arc::new(PgIdentityStore::new(pool.clone())),
///     tokens: Arc::new(JwtTokenIssuer::new(
///         config.jwt.secret.clone(),
///         chrono::Duration::hours(config.jwt.ttl_hours),
///         Arc::new(PgTokenDenylist::new(pool.clone())),
///     )),
///     otp: Arc::new(PgOtpDispatcher::new(
///         pool,
///         chrono::Duration::minutes(config.otp.ttl_minutes),
///         Arc::new(LogDelivery),
///     )),
///     files: Arc::new(LocalFileStore::new(config.uploads.dir.clone())),
/// };
/// let app = taskmarket_api::app::build_router(AppState::new(config, collaborators));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::security::SecurityHeadersLayer,
    routes::{account, auth, categories, health},
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use taskmarket_shared::{
    auth::middleware::{bearer_token, AuthContext},
    services::{
        authentication::AuthenticationService,
        ports::{FileStore, IdentityStore, OtpDispatcher, TokenIssuer},
        registration::RegistrationService,
    },
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Most supporting documents accepted in one helper registration
pub const MAX_DOCUMENTS: usize = 10;

/// Implementations of the service ports
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityStore>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub otp: Arc<dyn OtpDispatcher>,
    pub files: Arc<dyn FileStore>,
}

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Used directly for request validation (uniqueness, existence)
    pub identity: Arc<dyn IdentityStore>,

    /// Used directly by the bearer layer
    pub tokens: Arc<dyn TokenIssuer>,

    pub registration: RegistrationService,

    pub authentication: AuthenticationService,
}

impl AppState {
    /// Wires the orchestrators to their collaborators
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            identity,
            tokens,
            otp,
            files,
        } = collaborators;

        Self {
            config: Arc::new(config),
            registration: RegistrationService::new(
                identity.clone(),
                tokens.clone(),
                otp.clone(),
                files,
            ),
            authentication: AuthenticationService::new(identity.clone(), tokens.clone(), otp),
            identity,
            tokens,
        }
    }

    /// Body limit for the multipart helper registration
    pub fn multipart_limit(&self) -> usize {
        self.config
            .uploads
            .max_bytes
            .saturating_mul(MAX_DOCUMENTS + 1)
            .saturating_add(64 * 1024)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register          # Plain user (JSON)
///     │   ├── POST /register/helper   # Helper (multipart)
///     │   ├── POST /login
///     │   ├── POST /verify-email
///     │   ├── POST /resend-otp
///     │   ├── POST /password/code
///     │   ├── POST /password
///     │   └── POST /logout            # bearer
///     ├── /account                    # bearer
///     │   ├── GET    /me
///     │   └── DELETE /
///     └── /categories
///         ├── GET  /
///         ├── POST /                  # admin bearer
///         └── PUT  /:id               # admin bearer
/// ```
///
/// # Middleware Stack
///
/// 1. Security headers
/// 2. CORS
/// 3. Request tracing
/// 4. Bearer authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route(
            "/register/helper",
            post(auth::register_helper).layer(DefaultBodyLimit::max(state.multipart_limit())),
        )
        .route("/login", post(auth::login))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/password/code", post(auth::request_password_reset))
        .route("/password", post(auth::change_password));

    let protected_auth_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let account_routes = Router::new()
        .route("/", delete(account::delete_account))
        .route("/me", get(account::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Bearer applies to POST only; GET is added after the layer
    let category_routes = Router::new()
        .route(
            "/",
            post(categories::create)
                .route_layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    jwt_auth_layer,
                ))
                .get(categories::list),
        )
        .route(
            "/:id",
            put(categories::rename).route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                jwt_auth_layer,
            )),
        );

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/account", account_routes)
        .nest("/categories", category_routes);

    let cors = if state.config.cors_permissive() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

/// Bearer authentication layer
///
/// Validates the token (signature, expiry, denylist) and injects the
/// resulting [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_string();

    let claims = state.tokens.validate(&token).await.map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(AuthContext::from_claims(&claims, token));

    Ok(next.run(req).await)
}
