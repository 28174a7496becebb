use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{fetch_optional_activities, json_body, resolve_strava_token, RangeRequest};
use crate::burnout::{BurnoutComponents, BurnoutWeights, RiskLevel, WeightOverrides};
use crate::db::AppState;
use crate::error::ApiError;
use crate::models::recovery::merge_daily;
use crate::models::DailyWellness;
use crate::oura::{DatasetOptions, OuraClient};
use crate::stats::mean;
use crate::training_load::{load_risk, score_activities, weekly_load, ActivityLoad};
use crate::windows::{in_window, weekly_windows, DAY_FORMAT};

#[derive(Debug, Deserialize)]
pub struct BurnoutRequest {
  #[serde(flatten)]
  pub range: RangeRequest,
  #[serde(default)]
  pub weights: Option<WeightOverrides>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyBurnout {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  pub burnout_score: f64,
  pub risk_level: RiskLevel,
  pub components: BurnoutComponents,
  /// Raw weekly load, when Strava data was available
  pub training_load: Option<f64>,
  pub days: Vec<DailyWellness>,
  pub activities: Vec<ActivityLoad>,
}

#[derive(Debug, Serialize)]
pub struct BurnoutResponse {
  pub weeks: Vec<WeeklyBurnout>,
  pub average_score: f64,
  pub risk_level: RiskLevel,
  pub has_strava_data: bool,
  pub weights: BurnoutWeights,
}

/// POST /api/burnout
pub async fn burnout(
  State(state): State<AppState>,
  headers: HeaderMap,
  payload: Result<Json<BurnoutRequest>, JsonRejection>,
) -> Result<Json<BurnoutResponse>, ApiError> {
  let req = json_body(payload)?;
  let (start, end) = req.range.range()?;
  let weights = BurnoutWeights::with_overrides(&req.weights.unwrap_or_default())
    .map_err(|_| ApiError::BadRequest("Weights must be non-negative numbers"))?;

  let from = start.format(DAY_FORMAT).to_string();
  let to = end.format(DAY_FORMAT).to_string();
  let oura = OuraClient::from_config(state.http.clone(), &state.config)?;
  let dataset = oura
    .fetch_dataset(
      &from,
      &to,
      DatasetOptions {
        activity: true,
        stress: true,
        resilience: true,
      },
    )
    .await?;
  let days = merge_daily(&dataset);

  let token = resolve_strava_token(req.range.access_token.as_deref(), &headers, &state.config);
  let activities = fetch_optional_activities(
    &state,
    token.as_deref(),
    start,
    end,
    req.range.include_descriptions,
  )
  .await;

  let weeks: Vec<WeeklyBurnout> = weekly_windows(start, end)
    .into_iter()
    .map(|window| {
      let week_days = in_window(&days, &window, |d| Some(d.day));
      let loads = activities
        .as_deref()
        .map(|list| score_activities(&in_window(list, &window, |a| Some(a.day))));
      let training_load = loads.as_deref().map(weekly_load);

      let components = BurnoutComponents::compute(&week_days, training_load.map(load_risk));
      let burnout_score = components.burnout_score(&weights);

      WeeklyBurnout {
        week_start: window.start,
        week_end: window.end,
        burnout_score,
        risk_level: RiskLevel::from_score(burnout_score),
        components,
        training_load,
        days: week_days.into_iter().cloned().collect(),
        activities: loads.unwrap_or_default(),
      }
    })
    .collect();

  let average_score = mean(weeks.iter().map(|w| w.burnout_score)).unwrap_or(0.0);
  tracing::info!(
    %start,
    %end,
    weeks = weeks.len(),
    average_score,
    has_strava_data = activities.is_some(),
    "Burnout computed"
  );

  Ok(Json(BurnoutResponse {
    weeks,
    average_score,
    risk_level: RiskLevel::from_score(average_score),
    has_strava_data: activities.is_some(),
    weights,
  }))
}
