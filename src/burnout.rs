//! Burnout scoring
//!
//! Each sub-score is a 0-1 risk value computed over one window of daily
//! Oura records. The weekly burnout score is their weighted mean, scaled to
//! 0-100. Empty inputs score 0 (no evidence of risk).

use serde::{Deserialize, Serialize};

use crate::models::DailyWellness;
use crate::stats::mean;

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

const HRV_DROP_RATIO: f64 = 0.8;
const RHR_SPIKE_RATIO: f64 = 1.1;
const ACTIVE_CALORIES_CEILING: f64 = 5000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const UNKNOWN_RESILIENCE_RISK: f64 = 0.6;

/// ---------------------------------------------------------------------------
/// Sub-scores (0-1)
/// ---------------------------------------------------------------------------

/// Fraction of readings that fall outside `ratio * mean` in the given direction
fn outlier_fraction(values: &[f64], ratio: f64, below: bool) -> f64 {
  let Some(avg) = mean(values.iter().copied()) else {
    return 0.0;
  };
  let threshold = avg * ratio;
  let hits = values
    .iter()
    .filter(|v| if below { **v < threshold } else { **v > threshold })
    .count();
  (hits as f64 / values.len() as f64).min(1.0)
}

/// Fraction of nights with HRV below 80% of the window mean
pub fn hrv_drop_score(days: &[&DailyWellness]) -> f64 {
  let readings: Vec<f64> = days.iter().filter_map(|d| d.average_hrv).collect();
  outlier_fraction(&readings, HRV_DROP_RATIO, true)
}

/// Fraction of nights with resting HR above 110% of the window mean
pub fn resting_hr_score(days: &[&DailyWellness]) -> f64 {
  let readings: Vec<f64> = days.iter().filter_map(|d| d.resting_hr).collect();
  outlier_fraction(&readings, RHR_SPIKE_RATIO, false)
}

/// (100 - mean sleep score) / 100
pub fn sleep_risk_score(days: &[&DailyWellness]) -> f64 {
  let scores: Vec<f64> = days.iter().filter_map(|d| d.sleep_score).collect();
  mean(scores)
    .map(|avg| ((100.0 - avg) / 100.0).clamp(0.0, 1.0))
    .unwrap_or(0.0)
}

/// Total active calories against a 5000 kcal weekly ceiling
pub fn active_calories_score(days: &[&DailyWellness]) -> f64 {
  let total: f64 = days.iter().filter_map(|d| d.active_calories).sum();
  (total / ACTIVE_CALORIES_CEILING).clamp(0.0, 1.0)
}

/// Mean daily high-stress time as a fraction of a day
pub fn stress_score(days: &[&DailyWellness]) -> f64 {
  let seconds: Vec<f64> = days.iter().filter_map(|d| d.stress_high_seconds).collect();
  mean(seconds)
    .map(|avg| (avg / SECONDS_PER_DAY).clamp(0.0, 1.0))
    .unwrap_or(0.0)
}

/// Risk value for an Oura resilience level
pub fn resilience_risk(level: &str) -> f64 {
  match level.trim().to_ascii_lowercase().as_str() {
    "exceptional" => 0.0,
    "strong" => 0.1,
    "solid" => 0.2,
    "adequate" => 0.4,
    "limited" => 0.8,
    "compromised" => 1.0,
    _ => UNKNOWN_RESILIENCE_RISK,
  }
}

pub fn resilience_score(days: &[&DailyWellness]) -> f64 {
  let risks: Vec<f64> = days
    .iter()
    .filter_map(|d| d.resilience_level.as_deref())
    .map(resilience_risk)
    .collect();
  mean(risks).unwrap_or(0.0)
}

/// ---------------------------------------------------------------------------
/// Weighting
/// ---------------------------------------------------------------------------

/// Request-supplied weights; any field left out keeps its default
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WeightOverrides {
  pub hrv: Option<f64>,
  pub resting_hr: Option<f64>,
  pub sleep: Option<f64>,
  pub activity: Option<f64>,
  pub stress: Option<f64>,
  pub resilience: Option<f64>,
  pub training_load: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurnoutWeights {
  pub hrv: f64,
  pub resting_hr: f64,
  pub sleep: f64,
  pub activity: f64,
  pub stress: f64,
  pub resilience: f64,
  pub training_load: f64,
}

impl Default for BurnoutWeights {
  fn default() -> Self {
    Self {
      hrv: 0.25,
      resting_hr: 0.15,
      sleep: 0.20,
      activity: 0.10,
      stress: 0.15,
      resilience: 0.15,
      training_load: 0.10,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("weights must be finite and non-negative")]
pub struct InvalidWeights;

impl BurnoutWeights {
  pub fn with_overrides(overrides: &WeightOverrides) -> Result<Self, InvalidWeights> {
    let d = Self::default();
    let weights = Self {
      hrv: overrides.hrv.unwrap_or(d.hrv),
      resting_hr: overrides.resting_hr.unwrap_or(d.resting_hr),
      sleep: overrides.sleep.unwrap_or(d.sleep),
      activity: overrides.activity.unwrap_or(d.activity),
      stress: overrides.stress.unwrap_or(d.stress),
      resilience: overrides.resilience.unwrap_or(d.resilience),
      training_load: overrides.training_load.unwrap_or(d.training_load),
    };

    let all = [
      weights.hrv,
      weights.resting_hr,
      weights.sleep,
      weights.activity,
      weights.stress,
      weights.resilience,
      weights.training_load,
    ];
    if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
      return Err(InvalidWeights);
    }
    Ok(weights)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Moderate,
  High,
}

impl RiskLevel {
  pub fn from_score(score: f64) -> Self {
    match score {
      s if s >= 70.0 => RiskLevel::High,
      s if s >= 40.0 => RiskLevel::Moderate,
      _ => RiskLevel::Low,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Combined Score
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BurnoutComponents {
  pub hrv_drop: f64,
  pub resting_hr: f64,
  pub sleep: f64,
  pub activity: f64,
  pub stress: f64,
  pub resilience: f64,
  /// Only set when Strava data was available
  #[serde(skip_serializing_if = "Option::is_none")]
  pub training_load: Option<f64>,
}

impl BurnoutComponents {
  pub fn compute(days: &[&DailyWellness], training_load: Option<f64>) -> Self {
    Self {
      hrv_drop: hrv_drop_score(days),
      resting_hr: resting_hr_score(days),
      sleep: sleep_risk_score(days),
      activity: active_calories_score(days),
      stress: stress_score(days),
      resilience: resilience_score(days),
      training_load: training_load.map(|t| t.clamp(0.0, 1.0)),
    }
  }

  /// Weighted mean of the present components, scaled to 0-100
  pub fn burnout_score(&self, weights: &BurnoutWeights) -> f64 {
    let mut pairs = vec![
      (self.hrv_drop, weights.hrv),
      (self.resting_hr, weights.resting_hr),
      (self.sleep, weights.sleep),
      (self.activity, weights.activity),
      (self.stress, weights.stress),
      (self.resilience, weights.resilience),
    ];
    if let Some(load) = self.training_load {
      pairs.push((load, weights.training_load));
    }

    let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
      return 0.0;
    }
    let weighted: f64 = pairs.iter().map(|(s, w)| s * w).sum();
    (weighted / total_weight * 100.0).clamp(0.0, 100.0)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::wellness_day;

  fn with_hrv(values: &[f64]) -> Vec<DailyWellness> {
    values
      .iter()
      .enumerate()
      .map(|(i, v)| DailyWellness {
        average_hrv: Some(*v),
        ..wellness_day(i as u32 + 1)
      })
      .collect()
  }

  fn refs(days: &[DailyWellness]) -> Vec<&DailyWellness> {
    days.iter().collect()
  }

  #[test]
  fn test_hrv_drop_one_of_three() {
    // mean 83.3, threshold 66.7: only the 50ms night counts
    let days = with_hrv(&[50.0, 100.0, 100.0]);
    assert_approx_eq!(hrv_drop_score(&refs(&days)), 1.0 / 3.0, 1e-9);
  }

  #[test]
  fn test_hrv_drop_steady_is_zero() {
    let days = with_hrv(&[60.0, 62.0, 58.0, 61.0]);
    assert_eq!(hrv_drop_score(&refs(&days)), 0.0);
  }

  #[test]
  fn test_empty_inputs_score_zero() {
    let none: Vec<&DailyWellness> = Vec::new();
    assert_eq!(hrv_drop_score(&none), 0.0);
    assert_eq!(resting_hr_score(&none), 0.0);
    assert_eq!(sleep_risk_score(&none), 0.0);
    assert_eq!(stress_score(&none), 0.0);
    assert_eq!(resilience_score(&none), 0.0);
  }

  #[test]
  fn test_resting_hr_spike() {
    let days: Vec<DailyWellness> = [50.0, 50.0, 50.0, 70.0]
      .iter()
      .enumerate()
      .map(|(i, hr)| DailyWellness {
        resting_hr: Some(*hr),
        ..wellness_day(i as u32 + 1)
      })
      .collect();
    // mean 55, threshold 60.5
    assert_approx_eq!(resting_hr_score(&refs(&days)), 0.25, 1e-9);
  }

  #[test]
  fn test_sleep_risk_clamped() {
    let days = vec![
      DailyWellness { sleep_score: Some(70.0), ..wellness_day(1) },
      DailyWellness { sleep_score: Some(80.0), ..wellness_day(2) },
    ];
    assert_approx_eq!(sleep_risk_score(&refs(&days)), 0.25, 1e-9);

    let odd = vec![DailyWellness { sleep_score: Some(120.0), ..wellness_day(1) }];
    assert_eq!(sleep_risk_score(&refs(&odd)), 0.0);
  }

  #[test]
  fn test_active_calories_capped() {
    let days: Vec<DailyWellness> = (1..=7)
      .map(|i| DailyWellness { active_calories: Some(1000.0), ..wellness_day(i) })
      .collect();
    assert_eq!(active_calories_score(&refs(&days)), 1.0);

    let light = vec![DailyWellness { active_calories: Some(1250.0), ..wellness_day(1) }];
    assert_approx_eq!(active_calories_score(&refs(&light)), 0.25, 1e-9);
  }

  #[test]
  fn test_stress_fraction_of_day() {
    let days = vec![
      DailyWellness { stress_high_seconds: Some(7200.0), ..wellness_day(1) },
      DailyWellness { stress_high_seconds: Some(14400.0), ..wellness_day(2) },
    ];
    assert_approx_eq!(stress_score(&refs(&days)), 10800.0 / 86400.0, 1e-9);
  }

  #[test]
  fn test_resilience_solid_and_compromised() {
    let days = vec![
      DailyWellness { resilience_level: Some("solid".into()), ..wellness_day(1) },
      DailyWellness { resilience_level: Some("compromised".into()), ..wellness_day(2) },
    ];
    assert_approx_eq!(resilience_score(&refs(&days)), 0.6, 1e-9);
  }

  #[test]
  fn test_unknown_resilience_defaults() {
    assert_eq!(resilience_risk("mysterious"), 0.6);
    assert_eq!(resilience_risk("Strong"), 0.1);
  }

  #[test]
  fn test_weighted_score_ignores_missing_training_load() {
    let components = BurnoutComponents {
      hrv_drop: 1.0,
      resting_hr: 0.0,
      sleep: 0.0,
      activity: 0.0,
      stress: 0.0,
      resilience: 0.0,
      training_load: None,
    };
    let weights = BurnoutWeights::default();
    // 0.25 / 1.0 (training load weight excluded)
    assert_approx_eq!(components.burnout_score(&weights), 25.0, 1e-9);

    let with_load = BurnoutComponents { training_load: Some(1.0), ..components };
    // (0.25 + 0.10) / 1.10
    assert_approx_eq!(with_load.burnout_score(&weights), 35.0 / 1.1, 1e-9);
  }

  #[test]
  fn test_zero_weights_score_zero() {
    let overrides = WeightOverrides {
      hrv: Some(0.0),
      resting_hr: Some(0.0),
      sleep: Some(0.0),
      activity: Some(0.0),
      stress: Some(0.0),
      resilience: Some(0.0),
      training_load: Some(0.0),
    };
    let weights = BurnoutWeights::with_overrides(&overrides).unwrap();
    let components = BurnoutComponents::compute(&[], None);
    assert_eq!(components.burnout_score(&weights), 0.0);
  }

  #[test]
  fn test_weight_overrides_validated() {
    let overrides = WeightOverrides { sleep: Some(-0.1), ..Default::default() };
    assert_eq!(BurnoutWeights::with_overrides(&overrides), Err(InvalidWeights));

    let overrides = WeightOverrides { hrv: Some(0.5), ..Default::default() };
    let weights = BurnoutWeights::with_overrides(&overrides).unwrap();
    assert_eq!(weights.hrv, 0.5);
    assert_eq!(weights.sleep, 0.20);
  }

  #[test]
  fn test_risk_levels() {
    assert_eq!(RiskLevel::from_score(70.0), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(55.0), RiskLevel::Moderate);
    assert_eq!(RiskLevel::from_score(39.9), RiskLevel::Low);
  }
}
