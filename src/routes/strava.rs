use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::db::AppState;
use crate::error::ApiError;
use crate::strava::{StravaClient, StravaError, StravaTokens};

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
  pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
  pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
  pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
  pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPayload {
  pub access_token: String,
  pub refresh_token: String,
  /// Unix seconds
  pub expires_at: i64,
}

impl From<StravaTokens> for TokenPayload {
  fn from(tokens: StravaTokens) -> Self {
    Self {
      access_token: tokens.access_token,
      refresh_token: tokens.refresh_token,
      expires_at: tokens.expires_at.timestamp(),
    }
  }
}

fn required(value: Option<String>, message: &'static str) -> Result<String, ApiError> {
  value
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .ok_or(ApiError::BadRequest(message))
}

/// GET /api/strava/authorize?redirect_uri=...
pub async fn authorize_url(
  State(state): State<AppState>,
  Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
  let redirect_uri = required(query.redirect_uri, "Missing redirect_uri")?;
  let client = StravaClient::new(state.http.clone(), &state.config);

  let url = client.build_auth_url(&redirect_uri).map_err(|e| match e {
    StravaError::OAuth(_) => ApiError::BadRequest("Invalid redirect_uri"),
    other => other.into(),
  })?;

  Ok(Json(AuthorizeResponse { url }))
}

/// POST /api/strava/token
pub async fn exchange_token(
  State(state): State<AppState>,
  payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<TokenPayload>, ApiError> {
  let code = required(json_body(payload)?.code, "Missing authorization code")?;
  let client = StravaClient::new(state.http.clone(), &state.config);

  let tokens = client.exchange_code_for_tokens(&code).await?;
  tracing::info!(
    athlete_id = tokens.athlete.as_ref().map(|a| a.id),
    "Strava authorization code exchanged"
  );

  Ok(Json(tokens.into()))
}

/// POST /api/strava/refresh
pub async fn refresh_token(
  State(state): State<AppState>,
  payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPayload>, ApiError> {
  let refresh = required(json_body(payload)?.refresh_token, "Missing refresh_token")?;
  let client = StravaClient::new(state.http.clone(), &state.config);

  let tokens = client.refresh_tokens(&refresh).await?;
  tracing::info!("Strava tokens refreshed");

  Ok(Json(tokens.into()))
}
