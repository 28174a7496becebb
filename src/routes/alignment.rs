use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use super::{fetch_activities, json_body, resolve_strava_token, RangeRequest};
use crate::db::AppState;
use crate::error::ApiError;
use crate::models::recovery::merge_daily;
use crate::oura::{DatasetOptions, OuraClient};
use crate::recovery::{alignment_score, detect_mismatch, Mismatch, RecoveryComponents};
use crate::stats::mean;
use crate::training_load::{normalized_load, score_activities, weekly_load, ActivityLoad};
use crate::windows::{in_window, weekly_windows, WeekWindow, DAY_FORMAT};

/// Training load and recovery for one week, before any comparison
struct WeekState {
  window: WeekWindow,
  loads: Vec<ActivityLoad>,
  raw_load: f64,
  training_load: f64,
  recovery: RecoveryComponents,
  recovery_score: f64,
}

/// Shared fetch for both comparison endpoints. Strava is required here.
async fn load_and_recovery(
  state: &AppState,
  headers: &HeaderMap,
  req: &RangeRequest,
) -> Result<Vec<WeekState>, ApiError> {
  let (start, end) = req.range()?;
  let token = resolve_strava_token(req.access_token.as_deref(), headers, &state.config)
    .ok_or(ApiError::BadRequest("Strava access token is required"))?;

  let from = start.format(DAY_FORMAT).to_string();
  let to = end.format(DAY_FORMAT).to_string();
  let oura = OuraClient::from_config(state.http.clone(), &state.config)?;
  let dataset = oura.fetch_dataset(&from, &to, DatasetOptions::default()).await?;
  let days = merge_daily(&dataset);
  let activities = fetch_activities(state, &token, start, end, req.include_descriptions).await?;

  let weeks = weekly_windows(start, end)
    .into_iter()
    .map(|window| {
      let loads = score_activities(&in_window(&activities, &window, |a| Some(a.day)));
      let raw_load = weekly_load(&loads);
      let recovery = RecoveryComponents::compute(&in_window(&days, &window, |d| Some(d.day)));

      WeekState {
        window,
        raw_load,
        training_load: normalized_load(raw_load),
        recovery_score: recovery.score(),
        recovery,
        loads,
      }
    })
    .collect();

  Ok(weeks)
}

/// ---------------------------------------------------------------------------
/// Training Alignment
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WeeklyAlignment {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  /// Normalized 0-100
  pub training_load: f64,
  pub raw_training_load: f64,
  pub recovery_score: f64,
  pub recovery_components: RecoveryComponents,
  pub alignment_score: f64,
  pub activity_count: usize,
  pub activities: Vec<ActivityLoad>,
}

#[derive(Debug, Serialize)]
pub struct AlignmentResponse {
  pub weeks: Vec<WeeklyAlignment>,
  pub average_alignment: f64,
}

/// POST /api/training-alignment
pub async fn training_alignment(
  State(state): State<AppState>,
  headers: HeaderMap,
  payload: Result<Json<RangeRequest>, JsonRejection>,
) -> Result<Json<AlignmentResponse>, ApiError> {
  let req = json_body(payload)?;
  let weeks: Vec<WeeklyAlignment> = load_and_recovery(&state, &headers, &req)
    .await?
    .into_iter()
    .map(|w| WeeklyAlignment {
      week_start: w.window.start,
      week_end: w.window.end,
      training_load: w.training_load,
      raw_training_load: w.raw_load,
      recovery_score: w.recovery_score,
      recovery_components: w.recovery,
      alignment_score: alignment_score(w.training_load, w.recovery_score),
      activity_count: w.loads.len(),
      activities: w.loads,
    })
    .collect();

  let average_alignment = mean(weeks.iter().map(|w| w.alignment_score)).unwrap_or(0.0);
  tracing::info!(weeks = weeks.len(), average_alignment, "Training alignment computed");

  Ok(Json(AlignmentResponse {
    weeks,
    average_alignment,
  }))
}

/// ---------------------------------------------------------------------------
/// Strain / Recovery Mismatch
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WeeklyMismatch {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  pub training_load: f64,
  pub recovery_score: f64,
  #[serde(flatten)]
  pub mismatch: Mismatch,
  pub activity_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MismatchResponse {
  pub weeks: Vec<WeeklyMismatch>,
  pub mismatch_count: usize,
}

/// POST /api/strain-recovery-mismatch
pub async fn strain_recovery_mismatch(
  State(state): State<AppState>,
  headers: HeaderMap,
  payload: Result<Json<RangeRequest>, JsonRejection>,
) -> Result<Json<MismatchResponse>, ApiError> {
  let req = json_body(payload)?;
  let weeks: Vec<WeeklyMismatch> = load_and_recovery(&state, &headers, &req)
    .await?
    .into_iter()
    .map(|w| WeeklyMismatch {
      week_start: w.window.start,
      week_end: w.window.end,
      training_load: w.training_load,
      recovery_score: w.recovery_score,
      mismatch: detect_mismatch(w.training_load, w.recovery_score),
      activity_count: w.loads.len(),
    })
    .collect();

  let mismatch_count = weeks.iter().filter(|w| w.mismatch.is_mismatch).count();
  if mismatch_count > 0 {
    tracing::info!(mismatch_count, "Strain/recovery mismatch detected");
  }

  Ok(Json(MismatchResponse {
    weeks,
    mismatch_count,
  }))
}
