// src/dates.rs
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::api_types::{Field, RawEventRecord};
use crate::error::DateError;

/// Years beyond this magnitude are treated as garbage rather than dates.
const MAX_ABS_YEAR: i64 = 100_000;

/// Canonical, totally ordered event date.
///
/// Ordering is by signed year, then month, then day, so more ancient BCE
/// years sort first. Month/day arithmetic (calendar validity, day-of-year)
/// always runs against the absolute year; the sign is kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalDate {
    year: i32,
    month: u32,
    day: u32,
    is_bce: bool,
}

impl CanonicalDate {
    /// Missing or out-of-range month/day fall back to 1; a day past the end
    /// of the month is clamped to the last day.
    pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        let abs = abs_year(year);
        let month = month.filter(|m| (1..=12).contains(m)).unwrap_or(1);
        let day = day
            .filter(|d| *d >= 1)
            .map(|d| d.min(days_in_month(abs, month)))
            .unwrap_or(1);
        Self {
            year,
            month,
            day,
            is_bce: year < 1,
        }
    }

    /// Parse `YYYY-MM-DD`; a leading `-` marks a BCE year. Only the year is
    /// mandatory, trailing segments default to 1.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = body.split('-');
        let year_seg = parts.next()?.trim();
        if year_seg.is_empty() || !year_seg.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let magnitude: i64 = year_seg.parse().ok()?;
        let year = if negative { -magnitude } else { magnitude };
        let year = checked_year(year)?;
        let month = parts.next().and_then(numeric_prefix);
        let day = parts.next().and_then(numeric_prefix);
        Some(Self::new(year, month, day))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_bce(&self) -> bool {
        self.is_bce
    }

    pub fn abs_year(&self) -> i32 {
        abs_year(self.year)
    }

    /// Signed year plus the elapsed fraction of that year; the layout unit.
    pub fn fractional_year(&self) -> f64 {
        let abs = self.abs_year();
        let (ordinal0, len) = match NaiveDate::from_ymd_opt(abs, self.month, self.day) {
            Some(d) => (d.ordinal0(), if d.leap_year() { 366 } else { 365 }),
            None => (0, 365),
        };
        f64::from(self.year) + f64::from(ordinal0) / f64::from(len)
    }

    /// Identity-stable text form, e.g. `1979-02-11` or `-550-01-01`.
    pub fn iso(&self) -> String {
        format!("{}-{:02}-{:02}", self.year, self.month, self.day)
    }

    pub fn display_year(&self) -> String {
        format_year(i64::from(self.year))
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bce {
            write!(f, "{}-{:02}-{:02} BCE", self.abs_year(), self.month, self.day)
        } else {
            write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
        }
    }
}

/// `1979` or `550 BCE`. Year 0 and below are BCE.
pub fn format_year(year: i64) -> String {
    if year > 0 {
        year.to_string()
    } else {
        format!("{} BCE", year.unsigned_abs())
    }
}

/// Resolve a record's canonical date: explicit Gregorian string first, then
/// discrete year/month/day fields.
pub fn normalize_date(record: &RawEventRecord) -> Result<CanonicalDate, DateError> {
    let raw = record.text(Field::DateGregorian);
    if let Some(date) = raw.as_deref().and_then(CanonicalDate::parse) {
        return Ok(date);
    }

    let year = record
        .integer(Field::Year)
        .and_then(checked_year)
        .ok_or(DateError::Malformed { raw: raw.clone() })?;
    let month = record.integer(Field::Month).and_then(|m| u32::try_from(m).ok());
    let day = record.integer(Field::Day).and_then(|d| u32::try_from(d).ok());
    Ok(CanonicalDate::new(year, month, day))
}

fn checked_year(year: i64) -> Option<i32> {
    if year.abs() > MAX_ABS_YEAR {
        return None;
    }
    i32::try_from(year).ok()
}

fn abs_year(year: i32) -> i32 {
    // bounded by MAX_ABS_YEAR at construction
    year.saturating_abs()
}

fn numeric_prefix(seg: &str) -> Option<u32> {
    let digits: String = seg.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn record(v: serde_json::Value) -> RawEventRecord {
        serde_json::from_value(v).unwrap()
    }

    #[rstest]
    #[case::full("1979-02-11", 1979, 2, 11)]
    #[case::year_only("1501", 1501, 1, 1)]
    #[case::junk_month("1906-xx-05", 1906, 1, 5)]
    #[case::with_time("1925-12-15T00:00:00", 1925, 12, 15)]
    #[case::clamped_day("1900-02-30", 1900, 2, 28)]
    #[case::bce("-550-01-01", -550, 1, 1)]
    fn parses_gregorian_strings(#[case] raw: &str, #[case] y: i32, #[case] m: u32, #[case] d: u32) {
        let date = CanonicalDate::parse(raw).unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (y, m, d));
    }

    #[rstest]
    #[case::empty("")]
    #[case::words("unknown")]
    #[case::absurd("99999999-01-01")]
    fn rejects_yearless_strings(#[case] raw: &str) {
        assert_eq!(CanonicalDate::parse(raw), None);
    }

    #[test]
    fn bce_date_uses_absolute_year_and_sorts_first() {
        let bce = normalize_date(&record(json!({ "date_gregorian": "-550-01-01" }))).unwrap();
        assert!(bce.is_bce());
        assert_eq!(bce.abs_year(), 550);
        assert_eq!(bce.display_year(), "550 BCE");

        let ce = normalize_date(&record(json!({ "date_gregorian": "10-01-01" }))).unwrap();
        assert!(bce < ce);
        assert!(bce.fractional_year() < ce.fractional_year());
    }

    #[test]
    fn zero_year_is_bce() {
        let d = CanonicalDate::new(0, Some(6), Some(1));
        assert!(d.is_bce());
        assert_eq!(d.display_year(), "0 BCE");
    }

    #[test]
    fn order_is_signed_year_then_month_then_day() {
        let mut dates = vec![
            CanonicalDate::new(1979, Some(2), Some(11)),
            CanonicalDate::new(-100, Some(12), Some(31)),
            CanonicalDate::new(1979, Some(1), Some(30)),
            CanonicalDate::new(-500, Some(1), Some(1)),
            CanonicalDate::new(1979, Some(2), Some(1)),
        ];
        dates.sort();
        let iso: Vec<_> = dates.iter().map(CanonicalDate::iso).collect();
        assert_eq!(
            iso,
            vec!["-500-01-01", "-100-12-31", "1979-01-30", "1979-02-01", "1979-02-11"]
        );
    }

    #[test]
    fn falls_back_to_discrete_fields() {
        let r = record(json!({ "date_gregorian": "NaN", "year": 1848.0, "month": "9", "day": null }));
        let d = normalize_date(&r).unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (1848, 9, 1));
    }

    #[test]
    fn no_year_anywhere_is_malformed() {
        let r = record(json!({ "date_gregorian": "circa", "title": "x" }));
        assert_eq!(
            normalize_date(&r),
            Err(DateError::Malformed { raw: Some("circa".into()) })
        );
    }

    #[test]
    fn fractional_year_tracks_day_of_year() {
        let start = CanonicalDate::new(2000, Some(1), Some(1));
        let mid = CanonicalDate::new(2000, Some(7), Some(1));
        assert_eq!(start.fractional_year(), 2000.0);
        assert!(mid.fractional_year() > 2000.49 && mid.fractional_year() < 2000.5);
    }
}
