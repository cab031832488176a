use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LeadError, Result};

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

// Form exports write "2024-11-02 07:17:22 pm"; manual sheets use slashes.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %I:%M:%S %p",
    "%Y/%m/%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %I:%M %p",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];

/// Parse a timestamp that carries a time of day. Date-only values return `None`.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }
    let upper = trimmed.to_ascii_uppercase();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&upper, fmt).ok())
}

/// Parse any supported timestamp; date-only values land on midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = parse_datetime(raw) {
        return Some(dt);
    }
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date())
}

/// Strict `YYYY-MM-DD` parsing for user input.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| LeadError::InvalidDate(raw.to_string()))
}

fn date_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2}$",
            r"^[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2}\s+[0-9]{1,2}:[0-9]{1,2}",
            r"^[0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{4}$",
            r"^[0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{4}\s+[0-9]{1,2}:[0-9]{1,2}",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// A value counts as a date only when it looks like one and actually parses.
pub fn is_date_like(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.chars().count() < 8 {
        return false;
    }
    if !date_patterns().iter().any(|re| re.is_match(trimmed)) {
        return false;
    }
    parse_timestamp(trimmed).is_some()
}

/// Last representable instant of `date` (23:59:59.999).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// ---------------------------------------------------------------------------
// YearMonth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(LeadError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Every calendar day of the month, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.first_day();
        first
            .iter_days()
            .take_while(|d| d.month() == self.month)
            .collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LeadError::InvalidMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.is_empty() || m.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = LeadError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_form_export_pm() {
        let dt = parse_timestamp("2024-11-02 07:17:22 pm").unwrap();
        assert_eq!(dt.hour(), 19);
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
    }

    #[test]
    fn test_parse_twelve_am_is_midnight() {
        let dt = parse_timestamp("2024-11-02 12:05:00 am").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_slash_24h() {
        let dt = parse_timestamp("2024/11/02 19:17:22").unwrap();
        assert_eq!(dt.hour(), 19);
        assert_eq!(dt.minute(), 17);
    }

    #[test]
    fn test_parse_us_dashed_datetime() {
        assert!(is_date_like("11-02-2024 10:00"));
        let dt = parse_datetime("11-02-2024 10:00").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
        assert_eq!(dt.hour(), 10);
        let dt = parse_datetime("11-02-2024 10:00:30").unwrap();
        assert_eq!(dt.second(), 30);
    }

    #[test]
    fn test_parse_date_only_has_no_time() {
        assert!(parse_datetime("2024/11/02").is_none());
        let dt = parse_timestamp("2024/11/02").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_rejects_bare_year() {
        assert!(parse_timestamp("2024").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_is_date_like() {
        assert!(is_date_like("2024/11/02 19:17:22"));
        assert!(is_date_like("2024/11/02"));
        assert!(!is_date_like("\"2024/11/02 19:17:22\""));
        assert!(!is_date_like("2024"));
        assert!(!is_date_like("2024/13/45"));
    }

    #[test]
    fn test_end_of_day() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let eod = end_of_day(d);
        assert_eq!(eod.hour(), 23);
        assert_eq!(eod.minute(), 59);
        assert_eq!(eod.nanosecond(), 999_000_000);
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2024-02".parse().unwrap();
        assert_eq!(ym.to_string(), "2024-02");
        assert_eq!(ym.days().len(), 29);
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("202402".parse::<YearMonth>().is_err());
        assert!("24-02".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_year_month_ordering() {
        let a: YearMonth = "2023-12".parse().unwrap();
        let b: YearMonth = "2024-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_year_month_serde_as_string() {
        let ym: YearMonth = "2024-11".parse().unwrap();
        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2024-11\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym);
    }
}
