use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::oura::{OuraDataset, SleepPeriod};
use crate::windows::parse_day;

/// One day of Oura data, merged across collections
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyWellness {
  pub day: NaiveDate,
  /// Main sleep period only (naps ignored)
  pub average_hrv: Option<f64>,
  pub resting_hr: Option<f64>,
  pub sleep_seconds: Option<i64>,
  pub sleep_score: Option<f64>,
  pub readiness_score: Option<f64>,
  /// Readiness contributors, 0-100
  pub hrv_balance: Option<f64>,
  pub resting_hr_contributor: Option<f64>,
  pub activity_balance: Option<f64>,
  pub active_calories: Option<f64>,
  pub stress_high_seconds: Option<f64>,
  pub resilience_level: Option<String>,
}

impl DailyWellness {
  pub fn new(day: NaiveDate) -> Self {
    Self {
      day,
      ..Default::default()
    }
  }

  pub fn sleep_hours(&self) -> Option<f64> {
    self.sleep_seconds.map(|s| s as f64 / 3600.0)
  }
}

/// Merge every Oura collection into one record per day, sorted by day.
/// Rows with unparseable `day` strings are skipped.
pub fn merge_daily(dataset: &OuraDataset) -> Vec<DailyWellness> {
  let mut days: BTreeMap<NaiveDate, DailyWellness> = BTreeMap::new();

  let mut main_periods: BTreeMap<&str, &SleepPeriod> = BTreeMap::new();
  for period in &dataset.sleep_periods {
    main_periods
      .entry(period.day.as_str())
      .and_modify(|current| {
        if outranks(period, current) {
          *current = period;
        }
      })
      .or_insert(period);
  }
  for (day, period) in main_periods {
    if let Some(rec) = entry(&mut days, day) {
      rec.average_hrv = period.average_hrv;
      rec.resting_hr = period.lowest_heart_rate;
      rec.sleep_seconds = period.total_sleep_duration;
    }
  }

  for row in &dataset.daily_sleep {
    if let Some(rec) = entry(&mut days, &row.day) {
      rec.sleep_score = row.score;
    }
  }

  for row in &dataset.readiness {
    if let Some(rec) = entry(&mut days, &row.day) {
      rec.readiness_score = row.score;
      rec.hrv_balance = row.contributors.hrv_balance;
      rec.resting_hr_contributor = row.contributors.resting_heart_rate;
      rec.activity_balance = row.contributors.activity_balance;
    }
  }

  for row in &dataset.activity {
    if let Some(rec) = entry(&mut days, &row.day) {
      rec.active_calories = row.active_calories;
    }
  }

  for row in &dataset.stress {
    if let Some(rec) = entry(&mut days, &row.day) {
      rec.stress_high_seconds = row.stress_high;
    }
  }

  for row in &dataset.resilience {
    if let Some(rec) = entry(&mut days, &row.day) {
      rec.resilience_level = row.level.clone();
    }
  }

  days.into_values().collect()
}

fn entry<'a>(
  days: &'a mut BTreeMap<NaiveDate, DailyWellness>,
  day: &str,
) -> Option<&'a mut DailyWellness> {
  let date = parse_day(day)?;
  Some(days.entry(date).or_insert_with(|| DailyWellness::new(date)))
}

/// long_sleep beats anything else, then the longer period wins
fn outranks(candidate: &SleepPeriod, current: &SleepPeriod) -> bool {
  let is_long = |p: &SleepPeriod| p.period_type.as_deref() == Some("long_sleep");
  match (is_long(candidate), is_long(current)) {
    (true, false) => true,
    (false, true) => false,
    _ => candidate.total_sleep_duration.unwrap_or(0) > current.total_sleep_duration.unwrap_or(0),
  }
}
