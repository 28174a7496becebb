use chrono::{DateTime, Days, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{Config, StravaCredentials, MAX_PAGES};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const STRAVA_AUTH_URL: &str = "https://www.strava.com/oauth/authorize";
const PER_PAGE: u32 = 200;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Strava API error {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Failed to parse Strava response: {0}")]
  Parse(String),

  #[error("OAuth error: {0}")]
  OAuth(String),
}

/// ---------------------------------------------------------------------------
/// OAuth Data Structures
/// ---------------------------------------------------------------------------

/// Response from Strava token endpoint
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: i64,
  #[serde(default)]
  pub token_type: Option<String>,
  #[serde(default)]
  pub athlete: Option<AthleteInfo>,
}

/// Basic athlete info returned with tokens
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AthleteInfo {
  pub id: i64,
  pub firstname: Option<String>,
  pub lastname: Option<String>,
}

/// Token state handed back to the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub athlete: Option<AthleteInfo>,
}

impl StravaTokens {
  pub fn from_response(resp: TokenResponse) -> Self {
    Self {
      access_token: resp.access_token,
      refresh_token: resp.refresh_token,
      expires_at: DateTime::from_timestamp(resp.expires_at, 0).unwrap_or_else(Utc::now),
      athlete: resp.athlete,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Strava API - Activity Data Structures
/// ---------------------------------------------------------------------------

/// Activity summary (list endpoint) or detail (single activity endpoint)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StravaActivity {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  /// Strava uses "type" for legacy and "sport_type" for newer activities
  #[serde(rename = "type", default)]
  pub activity_type: String,
  #[serde(default)]
  pub sport_type: Option<String>,
  pub start_date: DateTime<Utc>,
  /// Athlete-local wall clock, serialized with a misleading "Z"
  #[serde(default)]
  pub start_date_local: Option<String>,
  #[serde(default)]
  pub elapsed_time: i64,
  #[serde(default)]
  pub moving_time: i64,
  #[serde(default)]
  pub distance: Option<f64>,
  #[serde(default)]
  pub total_elevation_gain: Option<f64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub max_heartrate: Option<f64>,
  #[serde(default)]
  pub average_watts: Option<f64>,
  #[serde(default)]
  pub suffer_score: Option<f64>,
  #[serde(default)]
  pub relative_effort: Option<f64>,
  /// Only present on the detail endpoint
  #[serde(default)]
  pub description: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Strava Client
/// ---------------------------------------------------------------------------

pub struct StravaClient {
  client: Client,
  api_base: String,
  token_url: String,
  credentials: Option<StravaCredentials>,
}

impl StravaClient {
  pub fn new(client: Client, config: &Config) -> Self {
    Self {
      client,
      api_base: config.strava_api_base.trim_end_matches('/').to_string(),
      token_url: config.strava_token_url.clone(),
      credentials: config.strava_credentials.clone(),
    }
  }

  /// Fetch every activity between two dates (inclusive), one page at a time
  pub async fn fetch_activities(
    &self,
    access_token: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<StravaActivity>, StravaError> {
    let after = epoch(start);
    // Exclusive upper bound: midnight after the last day
    let before = end
      .checked_add_days(Days::new(1))
      .map(epoch)
      .unwrap_or_else(|| epoch(end));
    let url = format!("{}/athlete/activities", self.api_base);

    let mut activities = Vec::new();
    for page in 1..=MAX_PAGES {
      let response = self
        .client
        .get(&url)
        .bearer_auth(access_token)
        .query(&[
          ("after", after.to_string()),
          ("before", before.to_string()),
          ("page", page.to_string()),
          ("per_page", PER_PAGE.to_string()),
        ])
        .send()
        .await?;

      let batch: Vec<StravaActivity> = parse_response(response).await?;
      let fetched = batch.len();
      activities.extend(batch);

      if fetched < PER_PAGE as usize {
        break;
      }
      if page == MAX_PAGES {
        tracing::warn!(pages = MAX_PAGES, "Strava pagination cap reached, results truncated");
      }
    }

    tracing::debug!(count = activities.len(), %start, %end, "fetched Strava activities");
    Ok(activities)
  }

  /// Fetch one activity with its description
  pub async fn fetch_activity(
    &self,
    access_token: &str,
    activity_id: i64,
  ) -> Result<StravaActivity, StravaError> {
    let response = self
      .client
      .get(format!("{}/activities/{}", self.api_base, activity_id))
      .bearer_auth(access_token)
      .send()
      .await?;

    parse_response(response).await
  }

  /// Replace summaries with their detail records, one request per activity
  pub async fn with_descriptions(
    &self,
    access_token: &str,
    activities: Vec<StravaActivity>,
  ) -> Result<Vec<StravaActivity>, StravaError> {
    let mut detailed = Vec::with_capacity(activities.len());
    for activity in activities {
      detailed.push(self.fetch_activity(access_token, activity.id).await?);
    }
    Ok(detailed)
  }

  /// -------------------------------------------------------------------------
  /// OAuth
  /// -------------------------------------------------------------------------

  /// URL the athlete visits to grant read access to their activities
  pub fn build_auth_url(&self, redirect_uri: &str) -> Result<String, StravaError> {
    let creds = self.credentials()?;
    let mut url = Url::parse(STRAVA_AUTH_URL).map_err(|e| StravaError::OAuth(e.to_string()))?;
    Url::parse(redirect_uri).map_err(|e| StravaError::OAuth(format!("redirect_uri: {}", e)))?;

    url
      .query_pairs_mut()
      .append_pair("client_id", &creds.client_id)
      .append_pair("redirect_uri", redirect_uri)
      .append_pair("response_type", "code")
      .append_pair("scope", "activity:read_all")
      .append_pair("approval_prompt", "auto");

    Ok(url.to_string())
  }

  pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<StravaTokens, StravaError> {
    let creds = self.credentials()?;
    let response = self
      .client
      .post(&self.token_url)
      .form(&[
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
      ])
      .send()
      .await?;

    let token_response: TokenResponse = parse_response(response).await?;
    Ok(StravaTokens::from_response(token_response))
  }

  pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<StravaTokens, StravaError> {
    let creds = self.credentials()?;
    let response = self
      .client
      .post(&self.token_url)
      .form(&[
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
      ])
      .send()
      .await?;

    let token_response: TokenResponse = parse_response(response).await?;
    Ok(StravaTokens::from_response(token_response))
  }

  fn credentials(&self) -> Result<&StravaCredentials, StravaError> {
    self
      .credentials
      .as_ref()
      .ok_or_else(|| StravaError::MissingConfig("STRAVA_CLIENT_ID/STRAVA_CLIENT_SECRET".into()))
  }
}

fn epoch(day: NaiveDate) -> i64 {
  day.and_hms_opt(0, 0, 0)
    .map(|dt| dt.and_utc().timestamp())
    .unwrap_or_default()
}

async fn parse_response<T: serde::de::DeserializeOwned>(
  response: reqwest::Response,
) -> Result<T, StravaError> {
  let status = response.status();
  let body = response.text().await?;

  if !status.is_success() {
    return Err(StravaError::Api {
      status: status.as_u16(),
      body,
    });
  }

  serde_json::from_str(&body).map_err(|e| {
    tracing::error!(
      error = %e,
      raw = %body.chars().take(500).collect::<String>(),
      "failed to parse Strava response"
    );
    StravaError::Parse(e.to_string())
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;

  fn activity_json(id: i64) -> serde_json::Value {
    serde_json::json!({
      "id": id,
      "name": "Morning Run",
      "type": "Run",
      "start_date": "2024-01-02T07:00:00Z",
      "start_date_local": "2024-01-02T08:00:00Z",
      "moving_time": 3600,
      "suffer_score": 42.0
    })
  }

  #[tokio::test]
  async fn test_fetch_activities_pages_until_short_page() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());

    let full_page: Vec<_> = (0..200).map(activity_json).collect();
    let page1 = server
      .mock("GET", "/athlete/activities")
      .match_header("authorization", "Bearer strava-token")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), "1".into()),
        Matcher::UrlEncoded("after".into(), "1704067200".into()),
        Matcher::UrlEncoded("before".into(), "1704672000".into()),
      ]))
      .with_status(200)
      .with_body(serde_json::to_string(&full_page).unwrap())
      .create_async()
      .await;
    let page2 = server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
      .with_status(200)
      .with_body(serde_json::to_string(&vec![activity_json(999)]).unwrap())
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    let activities = client.fetch_activities("strava-token", start, end).await.unwrap();

    assert_eq!(activities.len(), 201);
    assert_eq!(activities[200].id, 999);
    page1.assert_async().await;
    page2.assert_async().await;
  }

  #[tokio::test]
  async fn test_fetch_activities_stops_at_page_cap() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());

    let full_page: Vec<_> = (0..200).map(activity_json).collect();
    let mock = server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(serde_json::to_string(&full_page).unwrap())
      .expect(MAX_PAGES as usize)
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let activities = client.fetch_activities("t", day, day).await.unwrap();

    assert_eq!(activities.len(), 200 * MAX_PAGES as usize);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_fetch_activities_at_last_representable_day() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());
    let mock = server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body("[]")
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let activities = client
      .fetch_activities("t", NaiveDate::MAX, NaiveDate::MAX)
      .await
      .unwrap();

    assert!(activities.is_empty());
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_upstream_error_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());
    server
      .mock("GET", "/athlete/activities")
      .match_query(Matcher::Any)
      .with_status(401)
      .with_body(r#"{"message":"Authorization Error"}"#)
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let err = client.fetch_activities("bad", day, day).await.unwrap_err();
    assert!(matches!(err, StravaError::Api { status: 401, .. }));
  }

  #[tokio::test]
  async fn test_fetch_activity_detail_has_description() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());
    let mut detail = activity_json(7);
    detail["description"] = serde_json::json!("Coros Training Load: 85");
    server
      .mock("GET", "/activities/7")
      .with_status(200)
      .with_body(detail.to_string())
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let activity = client.fetch_activity("t", 7).await.unwrap();
    assert_eq!(activity.description.as_deref(), Some("Coros Training Load: 85"));
  }

  #[tokio::test]
  async fn test_exchange_code_for_tokens() {
    let mut server = mockito::Server::new_async().await;
    let config = Config::for_upstream(&server.url());
    server
      .mock("POST", "/oauth/token")
      .match_body(Matcher::AllOf(vec![
        Matcher::UrlEncoded("code".into(), "auth-code".into()),
        Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
        Matcher::UrlEncoded("client_id".into(), "12345".into()),
      ]))
      .with_status(200)
      .with_body(
        r#"{"access_token":"a","refresh_token":"r","expires_at":1704067200,"token_type":"Bearer","athlete":{"id":1,"firstname":"Sam","lastname":null}}"#,
      )
      .create_async()
      .await;

    let client = StravaClient::new(Client::new(), &config);
    let tokens = client.exchange_code_for_tokens("auth-code").await.unwrap();
    assert_eq!(tokens.access_token, "a");
    assert_eq!(tokens.expires_at.timestamp(), 1704067200);
    assert_eq!(tokens.athlete.map(|a| a.id), Some(1));
  }

  #[tokio::test]
  async fn test_token_exchange_requires_credentials() {
    let mut config = Config::for_upstream("http://127.0.0.1:9");
    config.strava_credentials = None;
    let client = StravaClient::new(Client::new(), &config);
    let err = client.refresh_tokens("r").await.unwrap_err();
    assert!(matches!(err, StravaError::MissingConfig(_)));
  }

  #[test]
  fn test_auth_url_carries_client_and_redirect() {
    let config = Config::for_upstream("http://127.0.0.1:9");
    let client = StravaClient::new(Client::new(), &config);
    let url = client.build_auth_url("http://localhost:3000/callback").unwrap();

    assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
    assert!(url.contains("client_id=12345"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"));
    assert!(url.contains("scope=activity%3Aread_all"));

    let err = client.build_auth_url("not a url").unwrap_err();
    assert!(matches!(err, StravaError::OAuth(_)));
  }

  #[test]
  fn test_epoch_is_utc_midnight() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(epoch(day), 1704067200);
  }
}
