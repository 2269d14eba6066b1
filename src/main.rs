mod api;
mod app;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;

use services::RedisCache;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting referral network backend"
    );

    // Create database pool and apply migrations
    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;

    // Create Redis cache
    let cache = RedisCache::new(&settings.redis_url, settings.redis_cache_ttl_seconds).await?;

    // Built-in expiration sweeper; an external scheduler hitting
    // POST /leads/sweep-expired covers deployments that disable this.
    if settings.sweep_interval_seconds > 0 {
        let sweep_pool = pool.clone();
        let interval = Duration::from_secs(settings.sweep_interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match services::lifecycle::sweep_expired(&sweep_pool, Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Sweeper expired overdue leads"),
                    Err(e) => tracing::warn!(error = %e, "Expiration sweep failed"),
                }
            }
        });
        tracing::info!(
            interval_seconds = settings.sweep_interval_seconds,
            "Expiration sweeper started"
        );
    }

    // Create application state
    let state = app::AppState::new(pool, settings.clone(), cache);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
