//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by the
//! auth crate through `kernel::error::AppError`.
//!
//! Environment:
//! - `DATABASE_URL` (required)
//! - `REDIS_URL` (optional; in-process session store when unset)
//! - `JWT_SECRET`, `COOKIE_SECRET` (required in release builds)
//! - `PASSWORD_PEPPER`, `COOKIE_SECURE`, `FRONTEND_ORIGINS`, `PORT`

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth::application::SeedUseCase;
use auth::{AuthConfig, PgIdentityStore, auth_router};
use axum::{
    Router, http,
    http::{Method, header},
};
use platform::kv::{MemoryStore, RedisStore};
use platform::password::CredentialVerifier;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3001;
const MEMORY_STORE_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let config = load_auth_config()?;
    let identity = PgIdentityStore::new(pool.clone());

    // Errors here should not prevent server startup
    seed_identities(&identity, &config).await;

    let cors = cors_layer();

    let auth = match env::var("REDIS_URL") {
        Ok(url) => {
            let kv = RedisStore::open(&url).context("Invalid REDIS_URL")?;
            if let Err(e) = kv.ping().await {
                tracing::warn!(error = %e, "Redis not reachable yet, will retry on first use");
            }
            tracing::info!("Session store: redis");
            auth_router(identity, kv, config)
        }
        Err(_) => {
            tracing::warn!("REDIS_URL not set, sessions are kept in process memory");
            let kv = MemoryStore::new();
            spawn_memory_purge(kv.clone());
            auth_router(identity, kv, config)
        }
    };

    // Build router
    let app = Router::new()
        .nest("/api/user", auth)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn load_auth_config() -> anyhow::Result<AuthConfig> {
    let mut config = if cfg!(debug_assertions) {
        let mut config = AuthConfig::development();
        if let Ok(secret) = env::var("JWT_SECRET") {
            config.token_secret = secret.into_bytes();
        }
        if let Ok(secret) = env::var("COOKIE_SECRET") {
            config.cookie_secret = secret.into_bytes();
        }
        config
    } else {
        // In production, secrets come from the environment
        AuthConfig {
            token_secret: required_secret("JWT_SECRET")?,
            cookie_secret: required_secret("COOKIE_SECRET")?,
            ..AuthConfig::default()
        }
    };

    if let Ok(secure) = env::var("COOKIE_SECURE") {
        config.cookie_secure = secure.eq_ignore_ascii_case("true") || secure == "1";
    }
    config.password_pepper = env::var("PASSWORD_PEPPER")
        .ok()
        .filter(|p| !p.is_empty())
        .map(String::into_bytes);

    Ok(config)
}

fn required_secret(name: &str) -> anyhow::Result<Vec<u8>> {
    let value = env::var(name).with_context(|| format!("{name} must be set in production"))?;
    anyhow::ensure!(!value.is_empty(), "{name} must not be empty");
    Ok(value.into_bytes())
}

async fn seed_identities(identity: &PgIdentityStore, config: &AuthConfig) {
    let verifier = Arc::new(CredentialVerifier::new(config.password_pepper.clone()));
    match SeedUseCase::new(Arc::new(identity.clone()), verifier)
        .execute()
        .await
    {
        Ok(true) => tracing::info!("Seeded default roles and accounts"),
        Ok(false) => tracing::debug!("Identity store already seeded"),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Seeding failed, continuing anyway"
            );
        }
    }
}

fn spawn_memory_purge(kv: MemoryStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_STORE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = kv.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Purged expired session keys");
            }
        }
    });
}

fn cors_layer() -> CorsLayer {
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}
