use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Days;

use super::{fetch_optional_activities, json_body, resolve_strava_token, RangeRequest};
use crate::db::AppState;
use crate::efficiency::{analyze, EfficiencyReport};
use crate::error::ApiError;
use crate::models::recovery::merge_daily;
use crate::oura::{DatasetOptions, OuraClient};
use crate::windows::DAY_FORMAT;

/// POST /api/recovery-efficiency
pub async fn recovery_efficiency(
  State(state): State<AppState>,
  headers: HeaderMap,
  payload: Result<Json<RangeRequest>, JsonRejection>,
) -> Result<Json<EfficiencyReport>, ApiError> {
  let req = json_body(payload)?;
  let (start, end) = req.range()?;

  // One extra day so the first day has a prior-night HRV to compare with
  let fetch_start = start.checked_sub_days(Days::new(1)).unwrap_or(start);

  let from = fetch_start.format(DAY_FORMAT).to_string();
  let to = end.format(DAY_FORMAT).to_string();
  let oura = OuraClient::from_config(state.http.clone(), &state.config)?;
  let dataset = oura.fetch_dataset(&from, &to, DatasetOptions::default()).await?;
  let days = merge_daily(&dataset);

  let token = resolve_strava_token(req.access_token.as_deref(), &headers, &state.config);
  let activities = fetch_optional_activities(&state, token.as_deref(), start, end, false).await;

  let report = analyze(&days, activities.as_deref(), start, end);
  tracing::info!(
    %start,
    %end,
    rest_days = report.rest_day_count,
    average_efficiency = ?report.average_efficiency,
    "Recovery efficiency computed"
  );

  Ok(Json(report))
}
