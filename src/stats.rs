use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::dates;
use crate::error::{LeadError, Result};
use crate::models::{Dataset, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Number,
    String,
    Date,
    Mixed,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn scalar_number(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => Some(*n),
        Scalar::Text(s) => parse_number(s),
        Scalar::Empty => None,
    }
}

// 80% threshold in integer arithmetic.
fn dominant(count: usize, total: usize) -> bool {
    count * 5 >= total * 4
}

/// Classify a column from its non-empty values.
pub fn detect_data_type<'a>(values: impl IntoIterator<Item = &'a Scalar>) -> DataType {
    let (mut numbers, mut dates_seen, mut strings) = (0usize, 0usize, 0usize);
    for value in values {
        match value {
            Scalar::Empty => continue,
            Scalar::Number(_) => numbers += 1,
            Scalar::Text(s) if dates::is_date_like(s) => dates_seen += 1,
            Scalar::Text(s) if parse_number(s).is_some() => numbers += 1,
            Scalar::Text(_) => strings += 1,
        }
    }
    let total = numbers + dates_seen + strings;
    if total == 0 {
        return DataType::String;
    }
    tracing::debug!(total, numbers, dates = dates_seen, strings, "classified column");

    if dominant(dates_seen, total) {
        DataType::Date
    } else if dominant(numbers, total) {
        DataType::Number
    } else if strings > 0 && (numbers > 0 || dates_seen > 0) {
        DataType::Mixed
    } else {
        DataType::String
    }
}

// ---------------------------------------------------------------------------
// Column statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsDetail {
    Numeric {
        min: f64,
        max: f64,
        mean: f64,
        median: f64,
        sum: f64,
    },
    Text {
        top_values: Vec<ValueCount>,
        max_length: usize,
        min_length: usize,
        avg_length: f64,
    },
    Date {
        hours: [usize; 24],
        /// Sunday first.
        weekdays: [usize; 7],
        min: NaiveDateTime,
        max: NaiveDateTime,
    },
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub data_type: DataType,
    pub total_count: usize,
    pub unique_count: usize,
    pub null_count: usize,
    pub detail: StatsDetail,
}

pub const WEEKDAY_NAMES: [&str; 7] = [
    "日曜日", "月曜日", "火曜日", "水曜日", "木曜日", "金曜日", "土曜日",
];

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Distinct values with counts, most frequent first; ties keep first-seen order.
fn frequencies(values: &[String]) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for value in values {
        match index.get(value.as_str()) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.as_str(), order.len());
                order.push((value.clone(), 1));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

fn numeric_detail(values: &[&Scalar]) -> StatsDetail {
    let mut numbers: Vec<f64> = values.iter().filter_map(|v| scalar_number(v)).collect();
    if numbers.is_empty() {
        return StatsDetail::None;
    }
    numbers.sort_by(|a, b| a.total_cmp(b));
    let n = numbers.len();
    let sum: f64 = numbers.iter().sum();
    let median = if n % 2 == 0 {
        (numbers[n / 2 - 1] + numbers[n / 2]) / 2.0
    } else {
        numbers[n / 2]
    };
    StatsDetail::Numeric {
        min: numbers[0],
        max: numbers[n - 1],
        mean: sum / n as f64,
        median,
        sum,
    }
}

fn text_detail(texts: &[String]) -> StatsDetail {
    if texts.is_empty() {
        return StatsDetail::None;
    }
    let total = texts.len();
    let top_values = frequencies(texts)
        .into_iter()
        .take(10)
        .map(|(value, count)| ValueCount {
            percentage: round_to(count as f64 / total as f64 * 100.0, 2),
            value,
            count,
        })
        .collect();
    let lengths: Vec<usize> = texts.iter().map(|t| t.chars().count()).collect();
    let avg = lengths.iter().sum::<usize>() as f64 / total as f64;
    StatsDetail::Text {
        top_values,
        max_length: lengths.iter().copied().max().unwrap_or(0),
        min_length: lengths.iter().copied().min().unwrap_or(0),
        avg_length: round_to(avg, 1),
    }
}

fn date_detail(texts: &[String]) -> StatsDetail {
    let stamps: Vec<NaiveDateTime> = texts.iter().filter_map(|t| dates::parse_timestamp(t)).collect();
    let (Some(min), Some(max)) = (stamps.iter().min().copied(), stamps.iter().max().copied()) else {
        return StatsDetail::None;
    };
    let mut hours = [0usize; 24];
    let mut weekdays = [0usize; 7];
    for stamp in &stamps {
        hours[stamp.hour() as usize] += 1;
        weekdays[stamp.weekday().num_days_from_sunday() as usize] += 1;
    }
    StatsDetail::Date {
        hours,
        weekdays,
        min,
        max,
    }
}

pub fn calculate_column_stats(dataset: &Dataset, column: &str) -> Result<ColumnStats> {
    let index = dataset
        .column(column)
        .ok_or_else(|| LeadError::MissingColumn(column.to_string()))?;

    let values: Vec<&Scalar> = dataset.column_values(index).collect();
    let present: Vec<&Scalar> = values.iter().copied().filter(|v| !v.is_empty()).collect();
    let texts: Vec<String> = present.iter().map(|v| v.as_text()).collect();

    let data_type = detect_data_type(present.iter().copied());
    let unique_count = texts.iter().collect::<HashSet<_>>().len();

    let detail = match data_type {
        DataType::Number => numeric_detail(&present),
        DataType::String | DataType::Mixed => text_detail(&texts),
        DataType::Date => date_detail(&texts),
    };

    Ok(ColumnStats {
        name: column.to_string(),
        data_type,
        total_count: values.len(),
        unique_count,
        null_count: values.len() - present.len(),
        detail,
    })
}

/// Most frequent non-empty values of a column, with percentages of the non-empty total.
pub fn value_frequencies(dataset: &Dataset, column: &str, limit: usize) -> Result<Vec<ValueCount>> {
    let index = dataset
        .column(column)
        .ok_or_else(|| LeadError::MissingColumn(column.to_string()))?;
    let texts: Vec<String> = dataset
        .column_values(index)
        .filter(|v| !v.is_empty())
        .map(|v| v.as_text())
        .collect();
    let total = texts.len();

    Ok(frequencies(&texts)
        .into_iter()
        .take(limit)
        .map(|(value, count)| ValueCount {
            percentage: round_to(count as f64 / total as f64 * 100.0, 2),
            value,
            count,
        })
        .collect())
}
