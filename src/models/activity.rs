use chrono::NaiveDate;
use serde::Serialize;

use crate::strava::StravaActivity;
use crate::windows::day_of;

/// Normalized training session, whatever platform it came from
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
  pub id: i64,
  pub name: String,
  pub activity_type: String,
  /// Local calendar day the session started on
  pub day: NaiveDate,
  pub moving_time_seconds: i64,
  pub distance_meters: Option<f64>,
  pub average_heartrate: Option<f64>,
  pub max_heartrate: Option<f64>,
  pub suffer_score: Option<f64>,
  pub relative_effort: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl Activity {
  pub fn moving_minutes(&self) -> f64 {
    self.moving_time_seconds as f64 / 60.0
  }
}

impl From<&StravaActivity> for Activity {
  fn from(a: &StravaActivity) -> Self {
    // Bucket by the athlete's local day when Strava gives it to us
    let day = a
      .start_date_local
      .as_deref()
      .and_then(day_of)
      .unwrap_or_else(|| a.start_date.date_naive());

    let activity_type = a
      .sport_type
      .clone()
      .filter(|s| !s.is_empty())
      .unwrap_or_else(|| a.activity_type.clone());

    Self {
      id: a.id,
      name: a.name.clone(),
      activity_type,
      day,
      moving_time_seconds: if a.moving_time > 0 { a.moving_time } else { a.elapsed_time },
      distance_meters: a.distance,
      average_heartrate: a.average_heartrate,
      max_heartrate: a.max_heartrate,
      suffer_score: a.suffer_score,
      relative_effort: a.relative_effort,
      description: a.description.clone(),
    }
  }
}

pub fn normalize_activities(activities: &[StravaActivity]) -> Vec<Activity> {
  activities.iter().map(Activity::from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::mock_strava_activity;

  #[test]
  fn test_local_day_wins_over_utc() {
    let mut raw = mock_strava_activity();
    raw.start_date = "2024-01-02T04:30:00Z".parse().unwrap();
    raw.start_date_local = Some("2024-01-01T23:30:00Z".to_string());

    let activity = Activity::from(&raw);
    assert_eq!(activity.day, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
  }

  #[test]
  fn test_sport_type_preferred_and_elapsed_fallback() {
    let mut raw = mock_strava_activity();
    raw.sport_type = Some("TrailRun".to_string());
    raw.moving_time = 0;
    raw.elapsed_time = 1800;

    let activity = Activity::from(&raw);
    assert_eq!(activity.activity_type, "TrailRun");
    assert_eq!(activity.moving_minutes(), 30.0);
  }
}
