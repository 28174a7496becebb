use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::db::AppState;
use crate::error::ApiError;
use crate::garmin::{
  insert_activities, insert_sleep, parse_activity_row, parse_rows, parse_sleep_row, CsvRow,
};

/// CSV rows as parsed by the client, keyed by header
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
  #[serde(default)]
  pub rows: Option<Vec<CsvRow>>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub inserted: u64,
  pub skipped: usize,
}

fn rows(req: UploadRequest) -> Result<Vec<CsvRow>, ApiError> {
  req
    .rows
    .filter(|rows| !rows.is_empty())
    .ok_or(ApiError::BadRequest("No rows provided"))
}

/// POST /api/garmin/activities
pub async fn upload_activities(
  State(state): State<AppState>,
  payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
  let rows = rows(json_body(payload)?)?;
  let parsed = parse_rows(&rows, parse_activity_row);
  let inserted = insert_activities(&state.db, &parsed.rows).await?;

  tracing::info!(inserted, skipped = parsed.skipped, "Garmin activities uploaded");
  Ok(Json(UploadResponse {
    inserted,
    skipped: parsed.skipped,
  }))
}

/// POST /api/garmin/sleep
pub async fn upload_sleep(
  State(state): State<AppState>,
  payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
  let rows = rows(json_body(payload)?)?;
  let parsed = parse_rows(&rows, parse_sleep_row);
  let inserted = insert_sleep(&state.db, &parsed.rows).await?;

  tracing::info!(inserted, skipped = parsed.skipped, "Garmin sleep uploaded");
  Ok(Json(UploadResponse {
    inserted,
    skipped: parsed.skipped,
  }))
}
