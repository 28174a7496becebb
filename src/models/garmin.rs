use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Row bound for the `garmin_activity` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GarminActivity {
  pub activity_type: Option<String>,
  pub activity_date: NaiveDateTime,
  pub title: Option<String>,
  pub distance: Option<f64>,
  pub calories: Option<f64>,
  pub duration_minutes: Option<f64>,
  pub avg_hr: Option<f64>,
  pub max_hr: Option<f64>,
  pub aerobic_te: Option<f64>,
  pub training_stress_score: Option<f64>,
  pub total_ascent: Option<f64>,
}

/// Row bound for the `garmin_sleep` table (one row per exported week)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GarminSleep {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  pub avg_duration_minutes: Option<f64>,
  pub sleep_score: Option<f64>,
  pub resting_hr: Option<f64>,
  pub hrv: Option<f64>,
  pub avg_bedtime: Option<String>,
  pub avg_wake_time: Option<String>,
}
