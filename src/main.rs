use anyhow::Context;
use tracing_subscriber::EnvFilter;

use instance_manager::config::{self, AppConfig};
use instance_manager::database::DatabaseManager;
use instance_manager::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    let config: AppConfig = config::config().clone();
    tracing::info!("Starting Instance Manager in {:?} mode", config.environment);
    if config.security.root_user_ids.is_empty() {
        tracing::warn!("No root users configured; only system callers see every data set");
    }

    let db = DatabaseManager::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;

    server::serve(AppState::new(db, config)).await
}
