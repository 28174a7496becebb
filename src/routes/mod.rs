//! HTTP routes
//!
//! One file per endpoint family. Handlers parse and validate the request,
//! fetch upstream data sequentially, then hand off to the scoring modules.

pub mod alignment;
pub mod burnout;
pub mod efficiency;
pub mod garmin;
pub mod strava;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::db::AppState;
use crate::error::ApiError;
use crate::models::{activity::normalize_activities, Activity};
use crate::strava::StravaClient;
use crate::windows::{parse_date_range, RangeError};

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/burnout", post(burnout::burnout))
    .route("/api/training-alignment", post(alignment::training_alignment))
    .route("/api/strain-recovery-mismatch", post(alignment::strain_recovery_mismatch))
    .route("/api/recovery-efficiency", post(efficiency::recovery_efficiency))
    .route("/api/garmin/activities", post(garmin::upload_activities))
    .route("/api/garmin/sleep", post(garmin::upload_sleep))
    .route("/api/strava/authorize", get(strava::authorize_url))
    .route("/api/strava/token", post(strava::exchange_token))
    .route("/api/strava/refresh", post(strava::refresh_token))
    .with_state(state)
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

/// ---------------------------------------------------------------------------
/// Shared Request Handling
/// ---------------------------------------------------------------------------

/// Unwrap a JSON body, turning axum's rejection into our 400 shape
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  payload
    .map(|Json(body)| body)
    .map_err(|rejection| {
      tracing::debug!(error = %rejection, "rejected request body");
      ApiError::BadRequest("Invalid JSON body")
    })
}

/// Date range fields common to the scoring endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeRequest {
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub access_token: Option<String>,
  #[serde(default)]
  pub include_descriptions: bool,
}

impl RangeRequest {
  pub fn range(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let (Some(start), Some(end)) = (self.start_date.as_deref(), self.end_date.as_deref()) else {
      return Err(ApiError::BadRequest("start_date and end_date are required"));
    };
    parse_date_range(start, end).map_err(|e| match e {
      RangeError::InvalidDate => ApiError::BadRequest("Dates must be in YYYY-MM-DD format"),
      RangeError::Inverted => ApiError::BadRequest("end_date must not be before start_date"),
    })
  }
}

/// Body token, then `Authorization: Bearer`, then `STRAVA_ACCESS_TOKEN`
pub fn resolve_strava_token(
  body_token: Option<&str>,
  headers: &HeaderMap,
  config: &Config,
) -> Option<String> {
  let from_body = body_token.map(str::trim).filter(|t| !t.is_empty());
  let from_header = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());

  from_body
    .or(from_header)
    .map(str::to_string)
    .or_else(|| config.strava_access_token.clone())
}

/// Fetch and normalize Strava activities, optionally with descriptions
pub async fn fetch_activities(
  state: &AppState,
  token: &str,
  start: NaiveDate,
  end: NaiveDate,
  include_descriptions: bool,
) -> Result<Vec<Activity>, ApiError> {
  let client = StravaClient::new(state.http.clone(), &state.config);
  let mut raw = client.fetch_activities(token, start, end).await?;
  if include_descriptions {
    raw = client.with_descriptions(token, raw).await?;
  }
  Ok(normalize_activities(&raw))
}

/// Same as `fetch_activities`, but a failure only costs the Strava signal
pub async fn fetch_optional_activities(
  state: &AppState,
  token: Option<&str>,
  start: NaiveDate,
  end: NaiveDate,
  include_descriptions: bool,
) -> Option<Vec<Activity>> {
  let token = token?;
  match fetch_activities(state, token, start, end, include_descriptions).await {
    Ok(activities) => Some(activities),
    Err(e) => {
      tracing::warn!(error = %e, "Strava fetch failed, continuing without training load");
      None
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use axum::body::Body;
  use axum::http::{Request, StatusCode};
  use tower::ServiceExt;

  use crate::test_utils::setup_test_db;

  pub async fn test_app(upstream: &str) -> Router {
    let pool = setup_test_db().await;
    router(AppState::new(pool, Config::for_upstream(upstream)))
  }

  pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .expect("valid request")
  }

  pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .expect("readable body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
  }

  #[tokio::test]
  async fn test_health() {
    let app = test_app("http://127.0.0.1:9").await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
  }

  #[tokio::test]
  async fn test_missing_dates_is_bad_request() {
    let app = test_app("http://127.0.0.1:9").await;
    let (status, body) = send(app, post_json("/api/burnout", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "start_date and end_date are required");
  }

  #[tokio::test]
  async fn test_out_of_range_year_is_bad_request() {
    let app = test_app("http://127.0.0.1:9").await;
    let (status, body) = send(
      app,
      post_json(
        "/api/burnout",
        json!({"start_date": "+262142-12-30", "end_date": "+262142-12-31"}),
      ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Dates must be in YYYY-MM-DD format");
  }

  #[tokio::test]
  async fn test_malformed_json_is_bad_request() {
    let app = test_app("http://127.0.0.1:9").await;
    let request = Request::builder()
      .method("POST")
      .uri("/api/recovery-efficiency")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from("{not json"))
      .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body");
  }

  #[test]
  fn test_range_validation() {
    let req = RangeRequest {
      start_date: Some("2024-01-10".into()),
      end_date: Some("2024-01-01".into()),
      ..Default::default()
    };
    assert!(matches!(req.range(), Err(ApiError::BadRequest(_))));

    let req = RangeRequest {
      start_date: Some("01/01/2024".into()),
      end_date: Some("2024-01-07".into()),
      ..Default::default()
    };
    assert!(matches!(req.range(), Err(ApiError::BadRequest(_))));
  }

  #[test]
  fn test_token_precedence() {
    let mut config = Config::for_upstream("http://127.0.0.1:9");
    config.strava_access_token = Some("env-token".into());

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());

    assert_eq!(
      resolve_strava_token(Some("body-token"), &headers, &config).as_deref(),
      Some("body-token")
    );
    assert_eq!(
      resolve_strava_token(Some("  "), &headers, &config).as_deref(),
      Some("header-token")
    );
    assert_eq!(
      resolve_strava_token(None, &HeaderMap::new(), &config).as_deref(),
      Some("env-token")
    );

    config.strava_access_token = None;
    assert_eq!(resolve_strava_token(None, &HeaderMap::new(), &config), None);
  }
}
