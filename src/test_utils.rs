//! Test utilities and helpers for unit and route testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Upstream mock helpers
//! - Helper assertions

use chrono::{NaiveDate, Utc};
use mockito::{Matcher, Mock, ServerGuard};
use sqlx::SqlitePool;

use crate::garmin::CsvRow;
use crate::models::{Activity, DailyWellness};
use crate::strava::StravaActivity;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
  sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
    .fetch_one(pool)
    .await
    .expect("Failed to count rows")
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A day in January 2024
pub fn date(day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 1, day).expect("valid January day")
}

/// Empty wellness record for 2024-01-<day>
pub fn wellness_day(day: u32) -> DailyWellness {
  DailyWellness::new(date(day))
}

/// Create a mock Strava activity for testing
pub fn mock_strava_activity() -> StravaActivity {
  StravaActivity {
    id: 123456,
    name: "Morning Run".to_string(),
    activity_type: "Run".to_string(),
    sport_type: None,
    start_date: Utc::now(),
    start_date_local: None,
    elapsed_time: 3600,
    moving_time: 3600,
    distance: Some(10000.0),
    total_elevation_gain: Some(100.0),
    average_heartrate: Some(145.0),
    max_heartrate: Some(165.0),
    average_watts: None,
    suffer_score: None,
    relative_effort: None,
    description: None,
  }
}

/// Normalized activity on 2024-01-01 with no effort signals
pub fn mock_activity(activity_type: &str, moving_seconds: i64) -> Activity {
  Activity {
    id: 1,
    name: format!("Test {}", activity_type),
    activity_type: activity_type.to_string(),
    day: date(1),
    moving_time_seconds: moving_seconds,
    distance_meters: None,
    average_heartrate: None,
    max_heartrate: None,
    suffer_score: None,
    relative_effort: None,
    description: None,
  }
}

/// One parsed CSV row with string cells
pub fn csv_row(cells: &[(&str, &str)]) -> CsvRow {
  cells
    .iter()
    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
    .collect()
}

/// ---------------------------------------------------------------------------
/// Upstream Mocks
/// ---------------------------------------------------------------------------

/// Serve one page of an Oura collection for any query
pub async fn mock_oura_collection(
  server: &mut ServerGuard,
  endpoint: &str,
  data: serde_json::Value,
) -> Mock {
  server
    .mock("GET", format!("/{}", endpoint).as_str())
    .match_query(Matcher::Any)
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(serde_json::json!({ "data": data, "next_token": null }).to_string())
    .create_async()
    .await
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('garmin_activity', 'garmin_sleep')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 2, "Expected 2 tables, got {}", tables.len());
    assert_eq!(count_rows(&pool, "garmin_activity").await, 0);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let activity = mock_strava_activity();
    assert_eq!(activity.activity_type, "Run");
    assert_eq!(activity.distance, Some(10000.0));

    let normalized = mock_activity("Ride", 1800);
    assert_eq!(normalized.moving_minutes(), 30.0);

    let row = csv_row(&[("Date", "2024-01-01")]);
    assert_eq!(row["Date"], serde_json::json!("2024-01-01"));

    assert_eq!(wellness_day(3).day, date(3));
  }
}
