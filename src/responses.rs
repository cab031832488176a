use std::collections::BTreeMap;

use crate::dates::{self, YearMonth};
use crate::models::Dataset;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyResponses {
    pub month: YearMonth,
    pub count: usize,
    pub change: Option<i64>,
    /// Percent change; `None` when there is no previous month or it had no responses.
    pub change_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSummary {
    /// Every row, dated or not.
    pub total: usize,
    pub months: Vec<MonthlyResponses>,
    pub average_per_month: f64,
    pub peak: Option<(YearMonth, usize)>,
    pub lowest: Option<(YearMonth, usize)>,
    pub period: Option<(YearMonth, YearMonth)>,
}

/// Response counts per month, oldest first, with month-over-month change.
pub fn monthly_responses(dataset: &Dataset, date_column: usize) -> Vec<MonthlyResponses> {
    let mut counts: BTreeMap<YearMonth, usize> = BTreeMap::new();
    for value in dataset.column_values(date_column) {
        if let Some(date) = dates::parse_date(&value.as_text()) {
            *counts.entry(YearMonth::of(date)).or_default() += 1;
        }
    }

    let mut previous: Option<usize> = None;
    counts
        .into_iter()
        .map(|(month, count)| {
            let change = previous.map(|prev| count as i64 - prev as i64);
            let change_rate = match (previous, change) {
                (Some(prev), Some(diff)) if prev > 0 => Some(diff as f64 / prev as f64 * 100.0),
                _ => None,
            };
            previous = Some(count);
            MonthlyResponses {
                month,
                count,
                change,
                change_rate,
            }
        })
        .collect()
}

pub fn response_summary(dataset: &Dataset, date_column: usize) -> ResponseSummary {
    let months = monthly_responses(dataset, date_column);
    let total = dataset.rows.len();

    let mut peak: Option<(YearMonth, usize)> = None;
    let mut lowest: Option<(YearMonth, usize)> = None;
    for m in &months {
        if peak.map_or(true, |(_, c)| m.count > c) {
            peak = Some((m.month, m.count));
        }
        if lowest.map_or(true, |(_, c)| m.count < c) {
            lowest = Some((m.month, m.count));
        }
    }

    let average_per_month = if months.is_empty() {
        0.0
    } else {
        total as f64 / months.len() as f64
    };
    let period = match (months.first(), months.last()) {
        (Some(first), Some(last)) => Some((first.month, last.month)),
        _ => None,
    };

    ResponseSummary {
        total,
        average_per_month,
        peak,
        lowest,
        period,
        months,
    }
}
