use reqwest::Client;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::Config;

pub type DbPool = SqlitePool;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
  pub db: DbPool,
  pub config: Config,
  pub http: Client,
}

impl AppState {
  pub fn new(db: DbPool, config: Config) -> Self {
    Self {
      db,
      config,
      http: Client::new(),
    }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
  tracing::info!(database_url, "Initializing database");

  // Every in-memory connection is its own database
  let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Database initialized successfully");
  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_initialize_in_memory_db_runs_migrations() {
    let pool = initialize_db("sqlite::memory:").await.unwrap();

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'garmin_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
    assert_eq!(names, vec!["garmin_activity", "garmin_sleep"]);

    pool.close().await;
  }
}
