//! Date ranges and weekly windows
//!
//! Windows start on the requested start date (not on a calendar Monday),
//! step 7 days, and the last one is clipped to the requested end date.

use chrono::{Days, NaiveDate};
use serde::Serialize;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl WeekWindow {
  /// Inclusive on both ends
  pub fn contains(&self, date: NaiveDate) -> bool {
    date >= self.start && date <= self.end
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
  #[error("start_date and end_date must be YYYY-MM-DD")]
  InvalidDate,
  #[error("end_date must not be before start_date")]
  Inverted,
}

/// Parse a `YYYY-MM-DD` pair into an ordered range
pub fn parse_date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), RangeError> {
  let start = parse_day(start).ok_or(RangeError::InvalidDate)?;
  let end = parse_day(end).ok_or(RangeError::InvalidDate)?;
  if end < start {
    return Err(RangeError::Inverted);
  }
  Ok((start, end))
}

/// Strict `YYYY-MM-DD`; chrono alone also accepts signed and 5+ digit years
pub fn parse_day(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  let plain_year = value.len() == 10 && value.as_bytes()[..4].iter().all(u8::is_ascii_digit);
  if !plain_year {
    return None;
  }
  NaiveDate::parse_from_str(value, DAY_FORMAT).ok()
}

/// Day part of an ISO timestamp or date string ("2024-01-03T07:00:00Z" -> 2024-01-03)
pub fn day_of(value: &str) -> Option<NaiveDate> {
  value.get(..10).and_then(parse_day)
}

pub fn weekly_windows(start: NaiveDate, end: NaiveDate) -> Vec<WeekWindow> {
  let mut windows = Vec::new();
  let mut cursor = start;

  while cursor <= end {
    let week_end = cursor.checked_add_days(Days::new(6)).map_or(end, |d| d.min(end));
    windows.push(WeekWindow {
      start: cursor,
      end: week_end,
    });
    match cursor.checked_add_days(Days::new(7)) {
      Some(next) => cursor = next,
      None => break,
    }
  }

  windows
}

/// Every day in the range, inclusive
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
  start.iter_days().take_while(|d| *d <= end).collect()
}

/// Records whose day falls inside the window
pub fn in_window<'a, T, F>(records: &'a [T], window: &WeekWindow, day: F) -> Vec<&'a T>
where
  F: Fn(&T) -> Option<NaiveDate>,
{
  records
    .iter()
    .filter(|r| day(r).is_some_and(|d| window.contains(d)))
    .collect()
}
