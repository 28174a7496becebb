//! Weekly recovery score, training/recovery alignment and strain mismatch

use serde::Serialize;

use crate::models::DailyWellness;
use crate::stats::mean;

const DEFAULT_RECOVERY: f64 = 50.0;
const MISMATCH_LOAD_FLOOR: f64 = 70.0;
const MISMATCH_RECOVERY_CEILING: f64 = 60.0;

/// Map nightly sleep hours onto a 0-100 score
pub fn sleep_duration_score(hours: f64) -> f64 {
  match hours {
    h if h >= 8.0 => 100.0,
    h if h >= 7.0 => 85.0,
    h if h >= 6.0 => 65.0,
    h if h >= 5.0 => 40.0,
    _ => 20.0,
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RecoveryComponents {
  pub hrv_balance: Option<f64>,
  pub resting_hr: Option<f64>,
  pub sleep_score: Option<f64>,
  pub sleep_duration: Option<f64>,
  pub readiness: Option<f64>,
}

impl RecoveryComponents {
  pub fn compute(days: &[&DailyWellness]) -> Self {
    Self {
      hrv_balance: mean(days.iter().filter_map(|d| d.hrv_balance)),
      resting_hr: mean(days.iter().filter_map(|d| d.resting_hr_contributor)),
      sleep_score: mean(days.iter().filter_map(|d| d.sleep_score)),
      sleep_duration: mean(days.iter().filter_map(|d| d.sleep_hours())).map(sleep_duration_score),
      readiness: mean(days.iter().filter_map(|d| d.readiness_score)),
    }
  }

  /// Unweighted mean of the present components; 50 when nothing is known
  pub fn score(&self) -> f64 {
    let parts = [
      self.hrv_balance,
      self.resting_hr,
      self.sleep_score,
      self.sleep_duration,
      self.readiness,
    ];
    mean(parts.into_iter().flatten())
      .unwrap_or(DEFAULT_RECOVERY)
      .clamp(0.0, 100.0)
  }
}

pub fn recovery_score(days: &[&DailyWellness]) -> f64 {
  RecoveryComponents::compute(days).score()
}

/// 100 when load and recovery match, falling by one point per point of gap
pub fn alignment_score(training_load: f64, recovery: f64) -> f64 {
  (100.0 - (training_load - recovery).abs()).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Moderate,
  High,
}

impl Severity {
  pub fn from_gap(gap: f64) -> Self {
    match gap {
      g if g > 50.0 => Severity::High,
      g if g > 30.0 => Severity::Moderate,
      _ => Severity::Low,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mismatch {
  pub is_mismatch: bool,
  pub gap: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub severity: Option<Severity>,
}

/// High strain on a poorly recovered body
pub fn detect_mismatch(training_load: f64, recovery: f64) -> Mismatch {
  let gap = training_load - recovery;
  let is_mismatch = training_load > MISMATCH_LOAD_FLOOR && recovery < MISMATCH_RECOVERY_CEILING;
  Mismatch {
    is_mismatch,
    gap,
    severity: is_mismatch.then(|| Severity::from_gap(gap)),
  }
}
