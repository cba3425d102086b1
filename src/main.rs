//! Cosplayhub - REST backend for a cosplay community site

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cosplayhub::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxBlacklistRepository, SqlxCategoryRepository, SqlxEventRepository,
            SqlxPartnerRepository, SqlxUserRepository,
        },
    },
    services::{
        auth::AuthService, category::CategoryService, event::EventService,
        media::CloudinaryClient, token::TokenService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cosplayhub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cosplayhub backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let blacklist_repo = SqlxBlacklistRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let event_repo = SqlxEventRepository::boxed(pool.clone());
    let partner_repo = SqlxPartnerRepository::boxed(pool.clone());

    // Image host client
    let image_host = Arc::new(CloudinaryClient::new(config.media.clone()));

    // Initialize services
    let auth_service = Arc::new(AuthService::new(user_repo.clone()));
    let token_service = Arc::new(TokenService::new(
        &config.auth,
        user_repo.clone(),
        blacklist_repo,
    ));
    let event_service = Arc::new(EventService::new(
        event_repo,
        category_repo.clone(),
        partner_repo,
        image_host,
    ));
    let category_service = Arc::new(CategoryService::new(category_repo));
    tracing::info!("Services initialized");

    // Build application state
    let state = AppState {
        auth_service,
        token_service: token_service.clone(),
        event_service,
        category_service,
    };

    // Prune naturally expired blacklist entries once an hour
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match token_service.purge_expired_blacklist().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Purged {} expired blacklist entries", purged),
                Err(e) => tracing::warn!("Blacklist purge failed: {}", e),
            }
        }
    });

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
