//! Training load
//!
//! Each activity gets one load value, taken from the best source available:
//! a "Training Load" figure written into the description by a watch sync,
//! the platform's relative effort, or an RPE x minutes estimate.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::Activity;

/// Weekly load that maps to a 100% score (roughly 9 h at RPE 7)
pub const WEEKLY_LOAD_CEILING: f64 = 3780.0;

static DESCRIPTION_LOAD: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)training\s*load\s*[:=]?\s*(\d+(?:\.\d+)?)").expect("static pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
  Description,
  RelativeEffort,
  Heuristic,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLoad {
  pub id: i64,
  pub name: String,
  pub activity_type: String,
  pub day: chrono::NaiveDate,
  pub load: f64,
  pub source: LoadSource,
}

/// Pull a training load number out of free text, e.g. "Training Load: 85"
pub fn load_from_description(description: &str) -> Option<f64> {
  DESCRIPTION_LOAD
    .captures(description)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse::<f64>().ok())
    .filter(|v| v.is_finite())
}

fn rpe_from_suffer_score(score: f64) -> Option<f64> {
  match score {
    s if s >= 150.0 => Some(9.0),
    s if s >= 100.0 => Some(8.0),
    s if s >= 50.0 => Some(6.0),
    s if s >= 25.0 => Some(4.0),
    s if s > 0.0 => Some(3.0),
    _ => None,
  }
}

fn rpe_from_type(activity_type: &str) -> f64 {
  let t = activity_type.to_ascii_lowercase();
  let has = |keys: &[&str]| keys.iter().any(|k| t.contains(k));

  if has(&["race"]) {
    9.0
  } else if has(&["interval", "hiit", "crossfit"]) {
    8.0
  } else if has(&["run", "swim", "rowing"]) {
    6.0
  } else if has(&["ride", "weighttraining"]) {
    5.0
  } else if has(&["hike"]) {
    4.0
  } else if has(&["walk"]) {
    3.0
  } else if has(&["yoga", "stretch"]) {
    2.0
  } else {
    5.0
  }
}

/// Estimated RPE: suffer score bucket first, activity type keyword second
pub fn estimate_rpe(activity: &Activity) -> f64 {
  activity
    .suffer_score
    .and_then(rpe_from_suffer_score)
    .unwrap_or_else(|| rpe_from_type(&activity.activity_type))
}

pub fn activity_load(activity: &Activity) -> (f64, LoadSource) {
  if let Some(load) = activity.description.as_deref().and_then(load_from_description) {
    return (load, LoadSource::Description);
  }
  if let Some(effort) = activity.relative_effort.filter(|e| *e > 0.0) {
    return (effort, LoadSource::RelativeEffort);
  }
  (
    estimate_rpe(activity) * activity.moving_minutes(),
    LoadSource::Heuristic,
  )
}

pub fn score_activities(activities: &[&Activity]) -> Vec<ActivityLoad> {
  activities
    .iter()
    .map(|a| {
      let (load, source) = activity_load(a);
      ActivityLoad {
        id: a.id,
        name: a.name.clone(),
        activity_type: a.activity_type.clone(),
        day: a.day,
        load,
        source,
      }
    })
    .collect()
}

pub fn weekly_load(loads: &[ActivityLoad]) -> f64 {
  loads.iter().map(|l| l.load).sum()
}

/// Weekly load as a 0-100 score
pub fn normalized_load(load: f64) -> f64 {
  (load / WEEKLY_LOAD_CEILING * 100.0).clamp(0.0, 100.0)
}

/// Weekly load as a 0-1 burnout component
pub fn load_risk(load: f64) -> f64 {
  (load / WEEKLY_LOAD_CEILING).clamp(0.0, 1.0)
}
