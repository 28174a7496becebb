//! Garmin Connect CSV coercion
//!
//! The dashboard parses the CSV exports in the browser and posts rows as
//! header -> cell maps. Everything here turns those loosely formatted cells
//! into typed values, then bulk-inserts the rows.

use chrono::{Days, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::{GarminActivity, GarminSleep};

/// One CSV row as posted by the client
pub type CsvRow = BTreeMap<String, Value>;

const MISSING: &str = "--";

/// ---------------------------------------------------------------------------
/// Field Coercion
/// ---------------------------------------------------------------------------

/// "1,234.5" -> 1234.5, "--" -> None
pub fn parse_number(raw: &str) -> Option<f64> {
  let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
  if cleaned.is_empty() || cleaned == MISSING {
    return None;
  }
  cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Inverse of `parse_number`, with Garmin-style thousands separators
pub fn format_number(value: f64) -> String {
  if !value.is_finite() {
    return MISSING.to_string();
  }

  let plain = value.abs().to_string();
  let (int_part, frac_part) = match plain.split_once('.') {
    Some((i, f)) => (i, Some(f)),
    None => (plain.as_str(), None),
  };

  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (i, digit) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }

  let sign = if value < 0.0 { "-" } else { "" };
  match frac_part {
    Some(f) => format!("{}{}.{}", sign, grouped, f),
    None => format!("{}{}", sign, grouped),
  }
}

/// "01:02:30" -> 62.5, "45:30" -> 45.5 (MM:SS)
pub fn parse_hms_minutes(raw: &str) -> Option<f64> {
  let raw = raw.trim();
  if raw.is_empty() || raw == MISSING {
    return None;
  }

  let parts: Vec<f64> = raw
    .split(':')
    .map(|p| p.trim().parse::<f64>().ok().filter(|v| *v >= 0.0))
    .collect::<Option<Vec<_>>>()?;

  match parts.as_slice() {
    [h, m, s] => Some(h * 60.0 + m + s / 60.0),
    [m, s] => Some(m + s / 60.0),
    _ => None,
  }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(?:(\d+(?:\.\d+)?)\s*h(?:rs?|ours?)?)?\s*(?:(\d+(?:\.\d+)?)\s*m(?:in(?:utes?|s)?)?)?$")
    .expect("static pattern")
});

/// "6h 34min" -> 394, "45min" -> 45, "7h" -> 420, "--" -> None
pub fn parse_duration_minutes(raw: &str) -> Option<f64> {
  let raw = raw.trim();
  if raw.is_empty() || raw == MISSING {
    return None;
  }
  if raw.contains(':') {
    return parse_hms_minutes(raw);
  }

  let caps = DURATION_RE.captures(raw)?;
  let hours = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
  let minutes = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
  if hours.is_none() && minutes.is_none() {
    return None;
  }
  Some(hours.unwrap_or(0.0) * 60.0 + minutes.unwrap_or(0.0))
}

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%m/%d/%Y %H:%M:%S",
  "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%B %d, %Y"];

pub fn parse_activity_date(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    .or_else(|| parse_plain_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_plain_date(raw: &str) -> Option<NaiveDate> {
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(raw.trim(), f).ok())
}

static ISO_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(\d{4}-\d{2}-\d{2})\s*[-–]\s*(\d{4}-\d{2}-\d{2})$")
    .expect("static pattern")
});

static SLASH_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(\d{1,2}/\d{1,2}/\d{4})\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{4})$")
    .expect("static pattern")
});

// "Dec 25, 2023 - Dec 31, 2023" | "Dec 25 - 31, 2023" | "Dec 25 - Jan 1, 2024"
static TEXT_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:,\s*(\d{4}))?\s*[-–]\s*(?:([A-Za-z]{3,9})\.?\s+)?(\d{1,2}),?\s+(\d{4})$",
  )
  .expect("static pattern")
});

fn month_number(name: &str) -> Option<u32> {
  const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
  ];
  let prefix = name.get(..3)?.to_ascii_lowercase();
  MONTHS.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}

/// Split a Garmin weekly sleep "Date" label into (week_start, week_end).
/// A single date is taken as the first day of a 7-day week.
pub fn split_week_range(raw: &str) -> Option<(NaiveDate, NaiveDate)> {
  let raw = raw.trim();

  let range = if let Some(caps) = ISO_RANGE_RE.captures(raw) {
    (parse_plain_date(&caps[1])?, parse_plain_date(&caps[2])?)
  } else if let Some(caps) = SLASH_RANGE_RE.captures(raw) {
    (parse_plain_date(&caps[1])?, parse_plain_date(&caps[2])?)
  } else if let Some(caps) = TEXT_RANGE_RE.captures(raw) {
    let start_month = month_number(&caps[1])?;
    let start_day: u32 = caps[2].parse().ok()?;
    let end_month = match caps.get(4) {
      Some(m) => month_number(m.as_str())?,
      None => start_month,
    };
    let end_day: u32 = caps[5].parse().ok()?;
    let end_year: i32 = caps[6].parse().ok()?;
    let start_year = match caps.get(3) {
      Some(y) => y.as_str().parse().ok()?,
      // Range crossing New Year only carries the closing year
      None if start_month > end_month => end_year - 1,
      None => end_year,
    };
    (
      NaiveDate::from_ymd_opt(start_year, start_month, start_day)?,
      NaiveDate::from_ymd_opt(end_year, end_month, end_day)?,
    )
  } else {
    let start = parse_plain_date(raw)?;
    (start, start.checked_add_days(Days::new(6))?)
  };

  (range.0 <= range.1).then_some(range)
}

/// ---------------------------------------------------------------------------
/// Row Mapping
/// ---------------------------------------------------------------------------

/// First non-empty cell among candidate headers, stringified
fn cell(row: &CsvRow, headers: &[&str]) -> Option<String> {
  headers.iter().find_map(|h| {
    let text = match row.get(*h)? {
      Value::String(s) => s.trim().to_string(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      _ => return None,
    };
    (!text.is_empty()).then_some(text)
  })
}

fn number(row: &CsvRow, headers: &[&str]) -> Option<f64> {
  cell(row, headers).as_deref().and_then(parse_number)
}

fn text(row: &CsvRow, headers: &[&str]) -> Option<String> {
  cell(row, headers).filter(|s| s != MISSING)
}

/// None when the date cell is missing or unparseable
pub fn parse_activity_row(row: &CsvRow) -> Option<GarminActivity> {
  let activity_date = parse_activity_date(&cell(row, &["Date", "Start Time"])?)?;

  Some(GarminActivity {
    activity_type: text(row, &["Activity Type"]),
    activity_date,
    title: text(row, &["Title"]),
    distance: number(row, &["Distance"]),
    calories: number(row, &["Calories"]),
    duration_minutes: cell(row, &["Time", "Moving Time", "Elapsed Time"])
      .as_deref()
      .and_then(parse_hms_minutes),
    avg_hr: number(row, &["Avg HR"]),
    max_hr: number(row, &["Max HR"]),
    aerobic_te: number(row, &["Aerobic TE"]),
    training_stress_score: number(row, &["Training Stress Score®", "Training Stress Score", "TSS"]),
    total_ascent: number(row, &["Total Ascent"]),
  })
}

/// None when the week label cannot be split into dates
pub fn parse_sleep_row(row: &CsvRow) -> Option<GarminSleep> {
  let (week_start, week_end) = split_week_range(&cell(row, &["Date", "Week"])?)?;

  Some(GarminSleep {
    week_start,
    week_end,
    avg_duration_minutes: cell(row, &["Avg Duration", "Duration"])
      .as_deref()
      .and_then(parse_duration_minutes),
    sleep_score: number(row, &["Avg Sleep Score", "Sleep Score", "Score"]),
    resting_hr: number(row, &["Avg Resting Heart Rate", "Resting Heart Rate"]),
    hrv: number(row, &["Avg HRV", "HRV", "Avg Overnight HRV"]),
    avg_bedtime: text(row, &["Avg Bedtime", "Bedtime"]),
    avg_wake_time: text(row, &["Avg Wake Time", "Wake Time"]),
  })
}

#[derive(Debug)]
pub struct ParsedRows<T> {
  pub rows: Vec<T>,
  pub skipped: usize,
}

pub fn parse_rows<T>(rows: &[CsvRow], parse: impl Fn(&CsvRow) -> Option<T>) -> ParsedRows<T> {
  let parsed: Vec<T> = rows.iter().filter_map(parse).collect();
  ParsedRows {
    skipped: rows.len() - parsed.len(),
    rows: parsed,
  }
}

/// ---------------------------------------------------------------------------
/// Database Helpers
/// ---------------------------------------------------------------------------

/// SQLite's default cap on bound parameters per statement
const MAX_BIND_PARAMS: usize = 999;
const ACTIVITY_COLUMNS: usize = 11;
const SLEEP_COLUMNS: usize = 8;

/// Multi-row insert inside one transaction; a failing chunk rolls back the
/// whole upload. No dedupe.
pub async fn insert_activities(db: &SqlitePool, rows: &[GarminActivity]) -> Result<u64, sqlx::Error> {
  let mut tx = db.begin().await?;
  let mut inserted = 0;

  for chunk in rows.chunks(MAX_BIND_PARAMS / ACTIVITY_COLUMNS) {
    let mut builder = QueryBuilder::<Sqlite>::new(
      "INSERT INTO garmin_activity (activity_type, activity_date, title, distance, calories, \
       duration_minutes, avg_hr, max_hr, aerobic_te, training_stress_score, total_ascent) ",
    );
    builder.push_values(chunk, |mut b, row| {
      b.push_bind(row.activity_type.clone())
        .push_bind(row.activity_date)
        .push_bind(row.title.clone())
        .push_bind(row.distance)
        .push_bind(row.calories)
        .push_bind(row.duration_minutes)
        .push_bind(row.avg_hr)
        .push_bind(row.max_hr)
        .push_bind(row.aerobic_te)
        .push_bind(row.training_stress_score)
        .push_bind(row.total_ascent);
    });
    inserted += builder.build().execute(&mut *tx).await?.rows_affected();
  }

  tx.commit().await?;
  Ok(inserted)
}

pub async fn insert_sleep(db: &SqlitePool, rows: &[GarminSleep]) -> Result<u64, sqlx::Error> {
  let mut tx = db.begin().await?;
  let mut inserted = 0;

  for chunk in rows.chunks(MAX_BIND_PARAMS / SLEEP_COLUMNS) {
    let mut builder = QueryBuilder::<Sqlite>::new(
      "INSERT INTO garmin_sleep (week_start, week_end, avg_duration_minutes, sleep_score, \
       resting_hr, hrv, avg_bedtime, avg_wake_time) ",
    );
    builder.push_values(chunk, |mut b, row| {
      b.push_bind(row.week_start)
        .push_bind(row.week_end)
        .push_bind(row.avg_duration_minutes)
        .push_bind(row.sleep_score)
        .push_bind(row.resting_hr)
        .push_bind(row.hrv)
        .push_bind(row.avg_bedtime.clone())
        .push_bind(row.avg_wake_time.clone());
    });
    inserted += builder.build().execute(&mut *tx).await?.rows_affected();
  }

  tx.commit().await?;
  Ok(inserted)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
