//! Club Portal Backend
//!
//! Membership portal REST backend: gated sign-in, member approval and
//! editorial content, served from SQLite or a local JSON store.

mod admin;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod guard;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use admin::{AdminService, ContentDefaults};
use auth::{AdminCredential, AuthService};
use config::Config;
use store::Backend;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub admin: Arc<AdminService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the services onto an already selected backend.
    pub fn new(config: Config, backend: Backend, fallback: Option<Backend>) -> Self {
        let credential =
            AdminCredential::new(config.admin_password.clone(), config.admin_email.clone());
        let admin = AdminService::new(
            backend.clone(),
            credential.clone(),
            ContentDefaults::from_config(&config),
        );
        let auth = AuthService::new(backend, fallback, credential);

        Self {
            auth: Arc::new(auth),
            admin: Arc::new(admin),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Club Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Local store path: {:?}", config.local_store_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_password.is_none() {
        tracing::warn!(
            "No administrator password configured (CLUB_ADMIN_PASSWORD). Administrator sign-in is disabled!"
        );
    }

    // Select the backend
    let (backend, fallback) = Backend::connect(&config).await?;
    let state = AppState::new(config.clone(), backend, fallback);

    if !state.auth.backend().is_configured() {
        tracing::warn!("Hosted backend not in use. Accounts and content stay in the local store");
    }

    if state.config.seed_content {
        let seeded = state.admin.seed_default_content().await?;
        tracing::info!("Seeded {} sample content items", seeded);
    }

    let auth_log = state.auth.on_auth_state_change(|change| {
        tracing::info!(
            event = ?change.kind,
            user_id = change.user.as_ref().map(|u| u.id.as_str()),
            "Auth state changed"
        );
    });

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    auth_log.unsubscribe();

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes
    let public_routes = Router::new()
        .route("/auth/signin", post(api::sign_in))
        .route("/auth/signup", post(api::sign_up))
        .route("/auth/signout", post(api::sign_out))
        .route("/auth/me", get(api::current_user))
        .route("/auth/guard", get(api::evaluate_guard))
        .route("/content/{page_type}", get(api::list_content))
        .route("/content/{page_type}/{id}", get(api::get_content));

    // Approved members
    let member_routes = Router::new()
        .route("/dashboard", get(api::dashboard))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            guard::require_member,
        ));

    // Admin panel
    let admin_routes = Router::new()
        .route("/users", get(api::list_users))
        .route("/users/pending", get(api::list_pending_users))
        .route("/users/{id}/approval", get(api::check_approval))
        .route("/users/{id}/approve", post(api::approve_user))
        .route("/users/{id}/reject", post(api::reject_user))
        .route("/users/{id}", delete(api::delete_user))
        .route("/content", post(api::create_content))
        .route(
            "/content/{id}",
            put(api::update_content).delete(api::delete_content),
        )
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            guard::require_admin,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .nest("/admin", admin_routes);

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
