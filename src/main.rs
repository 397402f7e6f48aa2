//! bpdash - Role-gated reporting dashboard over the poker settlement ledger
//! Mission: one place where admins audit every club line and players see
//! exactly their own results, nothing more.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bpdash_backend::{
    api::{self, AppState},
    auth::{api as auth_api, auth_middleware, AuthState, JwtHandler, UserStore},
    ledger::{LedgerStore, UserConfigStore},
    middleware::request_logging,
    models::Config,
    report::Scope,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    info!("🚀 bpdash reporting backend starting");

    let config = Config::from_env();

    // Authentication: user store + JWT
    let auth_db_path = resolve_data_path(Some(config.auth_db_path.clone()), "bpdash_auth.db");
    let user_store = Arc::new(UserStore::new(&auth_db_path)?);
    let jwt_handler = Arc::new(JwtHandler::new(config.jwt_secret.clone()));
    let auth_state = AuthState::new(user_store.clone(), jwt_handler.clone());

    info!("🔐 Authentication initialized at: {}", auth_db_path);

    // Ledger + preferences live in the same database file.
    let ledger_db_path = resolve_data_path(Some(config.ledger_db_path.clone()), "bpdash_ledger.db");
    let ledger = Arc::new(LedgerStore::new(&ledger_db_path)?);
    let configs = Arc::new(UserConfigStore::new(&ledger_db_path)?);

    // Every player in the ledger gets a login; existing accounts are kept.
    let players = ledger.distinct_players(&Scope::All);
    user_store
        .sync_player_accounts(&players)
        .context("Failed to seed player accounts")?;

    let app_state = AppState::new(ledger, configs);

    // Auth routes (separate router with auth state)
    let auth_router = Router::new()
        .route("/api/auth/login", post(auth_api::login))
        .with_state(auth_state.clone());

    // JWT-protected routes
    let protected_routes = Router::new()
        .route("/api/dashboard", get(api::dashboard))
        .route("/api/dashboard/options", get(api::get_options))
        .route("/api/dashboard/export.csv", get(api::export_csv))
        .route("/api/dashboard/export.xlsx", get(api::export_xlsx))
        .route("/api/config/:key", get(api::get_config).put(api::put_config))
        .with_state(app_state);

    let protected_auth_routes = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route("/api/auth/password", post(auth_api::change_password))
        .route(
            "/api/admin/users",
            get(auth_api::list_users).post(auth_api::create_user),
        )
        .route("/api/admin/users/:id", delete(auth_api::delete_user))
        .with_state(auth_state);

    let protected = protected_routes
        .merge(protected_auth_routes)
        .route_layer(middleware::from_fn_with_state(
            jwt_handler.clone(),
            auth_middleware,
        ));

    // Public routes
    let public_routes = Router::new().route("/health", get(health_check));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected)
        .merge(auth_router)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bpdash_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_data_path(filename: &str) -> String {
    // Anchor defaults to the crate directory so running from elsewhere doesn't
    // create a second empty database in the caller's cwd.
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(filename).to_string_lossy().to_string()
}

fn resolve_data_path(env_value: Option<String>, default_filename: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        return default_data_path(default_filename);
    };

    let p = PathBuf::from(raw);
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }

    // Treat relative paths as relative to the crate directory, not the cwd.
    base.join(p).to_string_lossy().to_string()
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate directory and its parent.
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../.env")];

    for p in candidates {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "🚀 bpdash operational"
}
