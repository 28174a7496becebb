//! Recovery efficiency
//!
//! How well the body bounces back on a low-activity day, judged from the
//! overnight HRV change against the previous night, sleep, and how quiet the
//! day actually was.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Activity, DailyWellness};
use crate::recovery::sleep_duration_score;
use crate::stats::mean;
use crate::windows::days_in_range;

const LOW_ACTIVITY_BALANCE: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EfficiencyFactors {
  pub hrv_improvement: Option<f64>,
  pub sleep_duration: Option<f64>,
  pub sleep_score: Option<f64>,
  pub low_activity: Option<f64>,
}

impl EfficiencyFactors {
  pub fn efficiency(&self) -> Option<f64> {
    let present = [
      self.hrv_improvement,
      self.sleep_duration,
      self.sleep_score,
      self.low_activity,
    ];
    mean(present.into_iter().flatten()).map(|v| v.clamp(0.0, 100.0))
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RestDay {
  pub date: NaiveDate,
  pub hrv: f64,
  pub previous_hrv: f64,
  pub hrv_change_pct: f64,
  pub factors: EfficiencyFactors,
  pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyReport {
  pub rest_days: Vec<RestDay>,
  pub average_efficiency: Option<f64>,
  pub rest_day_count: usize,
}

/// 50 for flat HRV, +/- 2.5 points per percent of change
pub fn hrv_improvement_score(pct_change: f64) -> f64 {
  (50.0 + 2.5 * pct_change).clamp(0.0, 100.0)
}

fn is_low_activity(day: &DailyWellness, active_days: Option<&BTreeSet<NaiveDate>>) -> bool {
  let no_workout = active_days.is_some_and(|set| !set.contains(&day.day));
  let quiet_readiness = day
    .activity_balance
    .is_some_and(|balance| balance < LOW_ACTIVITY_BALANCE);
  no_workout || quiet_readiness
}

/// Evaluate every day in `[start, end]`. `days` may include the day before
/// `start` so the first day can be compared against its prior night.
/// `activities` is `None` when Strava data is unavailable.
pub fn analyze(
  days: &[DailyWellness],
  activities: Option<&[Activity]>,
  start: NaiveDate,
  end: NaiveDate,
) -> EfficiencyReport {
  let by_day: BTreeMap<NaiveDate, &DailyWellness> = days.iter().map(|d| (d.day, d)).collect();
  let active_days: Option<BTreeSet<NaiveDate>> =
    activities.map(|list| list.iter().map(|a| a.day).collect());

  let mut rest_days = Vec::new();
  for date in days_in_range(start, end) {
    let Some(today) = by_day.get(&date) else {
      continue;
    };
    if !is_low_activity(today, active_days.as_ref()) {
      continue;
    }

    let Some(previous) = date
      .checked_sub_days(Days::new(1))
      .and_then(|prev| by_day.get(&prev))
    else {
      continue;
    };
    let (Some(hrv), Some(previous_hrv)) = (today.average_hrv, previous.average_hrv) else {
      continue;
    };
    if previous_hrv <= 0.0 {
      continue;
    }

    let hrv_change_pct = (hrv - previous_hrv) / previous_hrv * 100.0;
    let factors = EfficiencyFactors {
      hrv_improvement: Some(hrv_improvement_score(hrv_change_pct)),
      sleep_duration: today.sleep_hours().map(sleep_duration_score),
      sleep_score: today.sleep_score,
      low_activity: today.activity_balance.map(|b| (100.0 - b).clamp(0.0, 100.0)),
    };

    rest_days.push(RestDay {
      date,
      hrv,
      previous_hrv,
      hrv_change_pct,
      efficiency: factors.efficiency(),
      factors,
    });
  }

  let average_efficiency = mean(rest_days.iter().filter_map(|d| d.efficiency));

  tracing::debug!(rest_days = rest_days.len(), "Recovery efficiency computed");

  EfficiencyReport {
    rest_day_count: rest_days.len(),
    average_efficiency,
    rest_days,
  }
}
