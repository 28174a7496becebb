pub mod burnout;
pub mod config;
pub mod db;
pub mod efficiency;
pub mod error;
pub mod garmin;
pub mod logging;
pub mod models;
pub mod oura;
pub mod recovery;
pub mod routes;
pub mod stats;
pub mod strava;
pub mod training_load;
pub mod windows;

#[cfg(test)]
pub mod test_utils;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use config::Config;
use db::AppState;

/// Load `.env`, set up logging and the database, then serve until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  logging::init_from_env()?;

  let config = Config::from_env();
  if config.oura_api_token.is_none() {
    tracing::warn!("OURA_API_TOKEN is not set; scoring endpoints will fail");
  }

  let pool = db::initialize_db(&config.database_url)
    .await
    .context("Failed to initialize database")?;

  let bind_addr = config.bind_addr.clone();
  let app = routes::router(AppState::new(pool, config)).layer(TraceLayer::new_for_http());

  let listener = TcpListener::bind(&bind_addr)
    .await
    .with_context(|| format!("Failed to bind {}", bind_addr))?;
  tracing::info!(addr = %bind_addr, "Recovance listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  tracing::info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "Failed to listen for shutdown signal");
  }
}
