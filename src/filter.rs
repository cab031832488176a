use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::dates::{self, YearMonth};
use crate::error::{LeadError, Result};
use crate::models::Dataset;

const DATE_HEADER_HINTS: &[&str] = &["日時", "日付"];
const SAMPLE_ROWS: usize = 10;

/// Pick the timestamp column: header hints first, then the first column whose
/// leading rows mostly parse as timestamps.
pub fn detect_date_column(dataset: &Dataset) -> Option<usize> {
    let by_name = dataset.headers.iter().position(|h| {
        DATE_HEADER_HINTS.iter().any(|hint| h.contains(hint)) || h.to_lowercase().contains("date")
    });
    if by_name.is_some() {
        return by_name;
    }

    let sampled = dataset.rows.len().min(SAMPLE_ROWS);
    if sampled == 0 {
        return None;
    }
    (0..dataset.headers.len()).find(|&col| {
        let parsed = dataset.rows[..sampled]
            .iter()
            .filter(|row| dates::parse_timestamp(&row.text(col)).is_some())
            .count();
        parsed * 5 >= sampled * 4
    })
}

/// Configured column name wins; otherwise detection.
pub fn resolve_date_column(dataset: &Dataset, configured: Option<&str>) -> Result<usize> {
    match configured {
        Some(name) => dataset
            .column(name)
            .ok_or_else(|| LeadError::MissingColumn(name.to_string())),
        None => detect_date_column(dataset).ok_or(LeadError::NoDateColumn),
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Month(YearMonth),
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// Build a filter from `--month` / `--from` / `--to` style flags.
    pub fn from_flags(month: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        if let Some(m) = month {
            if from.is_some() || to.is_some() {
                return Err(LeadError::Other(
                    "--month cannot be combined with --from/--to".to_string(),
                ));
            }
            return Ok(DateFilter::Month(m.parse()?));
        }
        if from.is_none() && to.is_none() {
            return Ok(DateFilter::All);
        }
        let start = from.map(dates::parse_iso_date).transpose()?;
        let end = to.map(dates::parse_iso_date).transpose()?;
        Ok(DateFilter::Custom { start, end })
    }

    pub fn matches(&self, stamp: NaiveDateTime) -> bool {
        match self {
            DateFilter::All => true,
            DateFilter::Month(month) => month.contains(stamp.date()),
            DateFilter::Custom { start, end } => {
                start.map_or(true, |s| stamp >= dates::start_of_day(s))
                    && end.map_or(true, |e| stamp <= dates::end_of_day(e))
            }
        }
    }

    pub fn label(&self) -> String {
        let day = |d: &Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
        match self {
            DateFilter::All => "all".to_string(),
            DateFilter::Month(m) => m.to_string(),
            DateFilter::Custom { start, end } => format!("{} .. {}", day(start), day(end)),
        }
    }

    /// Rows whose timestamp falls inside the filter. Undated rows only survive `All`.
    pub fn apply(&self, dataset: &Dataset, date_column: usize) -> Dataset {
        if *self == DateFilter::All {
            return dataset.clone();
        }
        let rows = dataset
            .rows
            .iter()
            .filter(|row| {
                dates::parse_timestamp(&row.text(date_column)).is_some_and(|ts| self.matches(ts))
            })
            .cloned()
            .collect();
        dataset.with_rows(rows)
    }
}

/// Months that have at least one dated row, newest first.
pub fn available_months(dataset: &Dataset, date_column: usize) -> Vec<YearMonth> {
    let months: BTreeSet<YearMonth> = dataset
        .column_values(date_column)
        .filter_map(|v| dates::parse_date(&v.as_text()))
        .map(YearMonth::of)
        .collect();
    months.into_iter().rev().collect()
}

pub fn date_range(dataset: &Dataset, date_column: usize) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let stamps: Vec<NaiveDateTime> = dataset
        .column_values(date_column)
        .filter_map(|v| dates::parse_timestamp(&v.as_text()))
        .collect();
    let min = stamps.iter().min()?;
    let max = stamps.iter().max()?;
    Some((*min, *max))
}
