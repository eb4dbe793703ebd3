//! Skynote - Social reading platform backend

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skynote::{
    api::{self, AppState},
    config::Config,
    db,
    services::Services,
};

/// How often expired login failures are dropped
const LIMITER_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skynote=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Skynote...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");
    if config.auth.uses_dev_secret() {
        tracing::warn!("Using the built-in development JWT secret; set SKYNOTE_JWT_SECRET in production");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize services
    let services = Services::new(&pool, &config)?;
    let seeded = services.achievements.seed_defaults().await?;
    if seeded > 0 {
        tracing::info!("Seeded {} default achievements", seeded);
    }

    // Start rate limiter cleanup task
    {
        let users = services.users.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(LIMITER_CLEANUP_SECS));
            loop {
                interval.tick().await;
                users.cleanup_login_attempts().await;
            }
        });
    }

    // Build router
    let cors_origin = config.server.cors_origin.clone();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(services, config);
    let app = api::build_router(state, &cors_origin);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
