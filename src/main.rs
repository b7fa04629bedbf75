use tracing_subscriber::EnvFilter;

use rezollo::config;
use rezollo::database::DatabaseManager;
use rezollo::services::AccountService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::config();
    tracing::info!("Starting Rezollo API in {:?} mode", settings.environment);

    if settings.database.url.is_empty() {
        tracing::warn!("DATABASE_URL is not set; data endpoints will answer 503");
    } else {
        if settings.database.run_migrations {
            DatabaseManager::migrate().await?;
        }
        bootstrap_admin().await;
    }

    let bind_addr = format!("0.0.0.0:{}", settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Rezollo API listening on http://{}", bind_addr);

    axum::serve(listener, rezollo::app())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

async fn bootstrap_admin() {
    let security = &config::config().security;
    let (Some(email), Some(password)) = (&security.admin_email, &security.admin_password) else {
        return;
    };

    let result = match AccountService::new().await {
        Ok(accounts) => accounts.ensure_admin(email, password).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        tracing::error!("Failed to ensure bootstrap admin {}: {}", email, e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
