//! Oura Ring API v2 client
//!
//! Pulls the daily collections the scoring layer needs. Auth is a personal
//! access token held server-side (`OURA_API_TOKEN`).

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{Config, MAX_PAGES};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OuraError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("Oura API error {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Failed to parse Oura response: {0}")]
  Parse(String),
}

impl From<reqwest::Error> for OuraError {
  fn from(e: reqwest::Error) -> Self {
    OuraError::Request(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Oura API Data Structures
/// ---------------------------------------------------------------------------

/// Every usercollection endpoint wraps its rows the same way
#[derive(Debug, Deserialize)]
pub struct CollectionPage<T> {
  pub data: Vec<T>,
  #[serde(default)]
  pub next_token: Option<String>,
}

/// Sleep period from `/sleep` (carries HRV and heart rate)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepPeriod {
  pub day: String,                          // ISO date (YYYY-MM-DD)
  #[serde(default)]
  pub average_hrv: Option<f64>,             // milliseconds
  #[serde(default)]
  pub lowest_heart_rate: Option<f64>,       // bpm
  #[serde(default)]
  pub average_heart_rate: Option<f64>,      // bpm
  #[serde(default)]
  pub total_sleep_duration: Option<i64>,    // seconds
  #[serde(rename = "type", default)]
  pub period_type: Option<String>,          // long_sleep, sleep, late_nap, ...
}

/// `/daily_sleep`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySleep {
  pub day: String,
  #[serde(default)]
  pub score: Option<f64>,
}

/// `/daily_readiness`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyReadiness {
  pub day: String,
  #[serde(default)]
  pub score: Option<f64>,
  #[serde(default)]
  pub contributors: ReadinessContributors,
}

/// Readiness contributors are 0-100 sub-scores, not raw physiology
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessContributors {
  #[serde(default)]
  pub hrv_balance: Option<f64>,
  #[serde(default)]
  pub resting_heart_rate: Option<f64>,
  #[serde(default)]
  pub activity_balance: Option<f64>,
}

/// `/daily_activity`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyActivity {
  pub day: String,
  #[serde(default)]
  pub active_calories: Option<f64>,
}

/// `/daily_stress`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyStress {
  pub day: String,
  #[serde(default)]
  pub stress_high: Option<f64>, // seconds spent in high stress
}

/// `/daily_resilience`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyResilience {
  pub day: String,
  #[serde(default)]
  pub level: Option<String>,
}

/// Everything fetched for one request
#[derive(Debug, Clone, Default)]
pub struct OuraDataset {
  pub sleep_periods: Vec<SleepPeriod>,
  pub daily_sleep: Vec<DailySleep>,
  pub readiness: Vec<DailyReadiness>,
  pub activity: Vec<DailyActivity>,
  pub stress: Vec<DailyStress>,
  pub resilience: Vec<DailyResilience>,
}

/// Which collections a caller needs beyond sleep/readiness
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetOptions {
  pub activity: bool,
  pub stress: bool,
  pub resilience: bool,
}

/// ---------------------------------------------------------------------------
/// Oura Client
/// ---------------------------------------------------------------------------

pub struct OuraClient {
  client: Client,
  base_url: String,
  token: String,
}

impl OuraClient {
  pub fn new(client: Client, base_url: &str, token: &str) -> Self {
    Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      token: token.to_string(),
    }
  }

  pub fn from_config(client: Client, config: &Config) -> Result<Self, OuraError> {
    let token = config
      .oura_api_token
      .as_deref()
      .ok_or_else(|| OuraError::MissingConfig("OURA_API_TOKEN".into()))?;
    Ok(Self::new(client, &config.oura_api_base, token))
  }

  /// Fetch one collection for a date range, following `next_token`
  pub async fn fetch_collection<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    start_date: &str, // YYYY-MM-DD
    end_date: &str,   // YYYY-MM-DD
  ) -> Result<Vec<T>, OuraError> {
    let url = format!("{}/{}", self.base_url, endpoint);
    let mut rows = Vec::new();
    let mut next_token: Option<String> = None;

    for page_number in 1..=MAX_PAGES {
      let mut query = vec![
        ("start_date", start_date.to_string()),
        ("end_date", end_date.to_string()),
      ];
      if let Some(token) = &next_token {
        query.push(("next_token", token.clone()));
      }

      let response = self
        .client
        .get(&url)
        .bearer_auth(&self.token)
        .query(&query)
        .send()
        .await?;

      let status = response.status();
      let body = response.text().await?;

      if !status.is_success() {
        return Err(OuraError::Api {
          status: status.as_u16(),
          body,
        });
      }

      let page: CollectionPage<T> = serde_json::from_str(&body)
        .map_err(|e| OuraError::Parse(format!("{}: {}", endpoint, e)))?;
      rows.extend(page.data);

      let token = match page.next_token {
        Some(token) if !token.is_empty() => token,
        _ => break,
      };
      if next_token.as_deref() == Some(token.as_str()) {
        tracing::warn!(endpoint, "Oura repeated its next_token, stopping pagination");
        break;
      }
      if page_number == MAX_PAGES {
        tracing::warn!(endpoint, pages = MAX_PAGES, "Oura pagination cap reached, results truncated");
      }
      next_token = Some(token);
    }

    tracing::debug!(endpoint, rows = rows.len(), "fetched Oura collection");
    Ok(rows)
  }

  pub async fn fetch_sleep_periods(&self, start: &str, end: &str) -> Result<Vec<SleepPeriod>, OuraError> {
    self.fetch_collection("sleep", start, end).await
  }

  pub async fn fetch_daily_sleep(&self, start: &str, end: &str) -> Result<Vec<DailySleep>, OuraError> {
    self.fetch_collection("daily_sleep", start, end).await
  }

  pub async fn fetch_daily_readiness(
    &self,
    start: &str,
    end: &str,
  ) -> Result<Vec<DailyReadiness>, OuraError> {
    self.fetch_collection("daily_readiness", start, end).await
  }

  pub async fn fetch_daily_activity(&self, start: &str, end: &str) -> Result<Vec<DailyActivity>, OuraError> {
    self.fetch_collection("daily_activity", start, end).await
  }

  pub async fn fetch_daily_stress(&self, start: &str, end: &str) -> Result<Vec<DailyStress>, OuraError> {
    self.fetch_collection("daily_stress", start, end).await
  }

  pub async fn fetch_daily_resilience(
    &self,
    start: &str,
    end: &str,
  ) -> Result<Vec<DailyResilience>, OuraError> {
    self.fetch_collection("daily_resilience", start, end).await
  }

  /// Sleep, daily sleep and readiness are required; the rest are optional
  /// and come back empty (with a warning) when the upstream call fails.
  pub async fn fetch_dataset(
    &self,
    start: &str,
    end: &str,
    options: DatasetOptions,
  ) -> Result<OuraDataset, OuraError> {
    let sleep_periods = self.fetch_sleep_periods(start, end).await?;
    let daily_sleep = self.fetch_daily_sleep(start, end).await?;
    let readiness = self.fetch_daily_readiness(start, end).await?;

    let activity = if options.activity {
      self.fetch_daily_activity(start, end).await?
    } else {
      Vec::new()
    };

    let stress = if options.stress {
      optional("daily_stress", self.fetch_daily_stress(start, end).await)
    } else {
      Vec::new()
    };

    let resilience = if options.resilience {
      optional("daily_resilience", self.fetch_daily_resilience(start, end).await)
    } else {
      Vec::new()
    };

    Ok(OuraDataset {
      sleep_periods,
      daily_sleep,
      readiness,
      activity,
      stress,
      resilience,
    })
  }
}

fn optional<T>(endpoint: &str, result: Result<Vec<T>, OuraError>) -> Vec<T> {
  result.unwrap_or_else(|e| {
    tracing::warn!(endpoint, error = %e, "optional Oura fetch failed, continuing without it");
    Vec::new()
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
