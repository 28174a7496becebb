//! HTTP-facing error type
//!
//! Upstream client errors (`OuraError`, `StravaError`) fold into `ApiError`,
//! which owns the mapping to status codes and JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::oura::OuraError;
use crate::strava::StravaError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// Caller error, reported verbatim
  #[error("{0}")]
  BadRequest(&'static str),

  /// Non-2xx from a third-party API; status is passed through
  #[error("{provider} API error: {body}")]
  Upstream {
    provider: &'static str,
    status: u16,
    body: String,
  },

  #[error("Internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Upstream { status, .. } => {
        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
      }
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let message = match &self {
      ApiError::Internal(detail) => {
        tracing::error!(error = %detail, "request failed");
        "Internal server error".to_string()
      }
      ApiError::Upstream { provider, status, .. } => {
        tracing::warn!(provider, status, "upstream API error");
        self.to_string()
      }
      ApiError::BadRequest(_) => self.to_string(),
    };

    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<OuraError> for ApiError {
  fn from(e: OuraError) -> Self {
    match e {
      OuraError::Api { status, body } => ApiError::Upstream {
        provider: "Oura",
        status,
        body,
      },
      other => ApiError::Internal(other.to_string()),
    }
  }
}

impl From<StravaError> for ApiError {
  fn from(e: StravaError) -> Self {
    match e {
      StravaError::Api { status, body } => ApiError::Upstream {
        provider: "Strava",
        status,
        body,
      },
      other => ApiError::Internal(other.to_string()),
    }
  }
}

impl From<sqlx::Error> for ApiError {
  fn from(e: sqlx::Error) -> Self {
    ApiError::Internal(format!("Database error: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_upstream_status_passes_through() {
    let err = ApiError::from(StravaError::Api {
      status: 429,
      body: "Rate Limit Exceeded".into(),
    });
    assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err.to_string(), "Strava API error: Rate Limit Exceeded");
  }

  #[test]
  fn test_bogus_upstream_status_maps_to_bad_gateway() {
    let err = ApiError::Upstream {
      provider: "Oura",
      status: 42,
      body: String::new(),
    };
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn test_non_api_client_errors_are_internal() {
    let err = ApiError::from(OuraError::MissingConfig("OURA_API_TOKEN".into()));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn test_internal_body_is_generic() {
    let response = ApiError::Internal("disk on fire".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Internal server error");
  }
}
