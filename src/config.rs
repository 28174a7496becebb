//! Environment-driven configuration
//!
//! Everything comes from the process environment (optionally seeded from a
//! `.env` file by `run()`). Upstream base URLs are overridable so the
//! clients can be pointed at a local mock server.

use std::env;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

pub const DEFAULT_DATABASE_URL: &str = "sqlite://recovance.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_OURA_API_BASE: &str = "https://api.ouraring.com/v2/usercollection";
pub const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

/// Page limit for every paginated upstream fetch (Oura and Strava)
pub const MAX_PAGES: u32 = 50;

/// Strava OAuth application credentials
#[derive(Debug, Clone)]
pub struct StravaCredentials {
  pub client_id: String,
  pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub bind_addr: String,
  /// Server-side Oura personal access token
  pub oura_api_token: Option<String>,
  pub oura_api_base: String,
  /// Fallback Strava token used when a request carries none
  pub strava_access_token: Option<String>,
  pub strava_credentials: Option<StravaCredentials>,
  pub strava_api_base: String,
  pub strava_token_url: String,
}

impl Config {
  pub fn from_env() -> Self {
    let strava_credentials = match (non_empty("STRAVA_CLIENT_ID"), non_empty("STRAVA_CLIENT_SECRET")) {
      (Some(client_id), Some(client_secret)) => Some(StravaCredentials {
        client_id,
        client_secret,
      }),
      _ => None,
    };

    Self {
      database_url: non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
      bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
      oura_api_token: non_empty("OURA_API_TOKEN"),
      oura_api_base: non_empty("OURA_API_BASE")
        .unwrap_or_else(|| DEFAULT_OURA_API_BASE.to_string()),
      strava_access_token: non_empty("STRAVA_ACCESS_TOKEN"),
      strava_credentials,
      strava_api_base: non_empty("STRAVA_API_BASE")
        .unwrap_or_else(|| DEFAULT_STRAVA_API_BASE.to_string()),
      strava_token_url: non_empty("STRAVA_TOKEN_URL")
        .unwrap_or_else(|| DEFAULT_STRAVA_TOKEN_URL.to_string()),
    }
  }

  /// Config pointing both upstreams at the same base URL (mock servers)
  #[cfg(test)]
  pub fn for_upstream(base_url: &str) -> Self {
    Self {
      database_url: "sqlite::memory:".to_string(),
      bind_addr: DEFAULT_BIND_ADDR.to_string(),
      oura_api_token: Some("oura-test-token".to_string()),
      oura_api_base: base_url.to_string(),
      strava_access_token: None,
      strava_credentials: Some(StravaCredentials {
        client_id: "12345".to_string(),
        client_secret: "shh".to_string(),
      }),
      strava_api_base: base_url.to_string(),
      strava_token_url: format!("{}/oauth/token", base_url),
    }
  }
}

fn non_empty(key: &str) -> Option<String> {
  env::var(key).ok().filter(|v| !v.trim().is_empty())
}
