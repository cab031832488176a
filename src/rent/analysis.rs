use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::buckets::{bucket_for, BUCKETS};
use super::RentStrategy;
use crate::channel::Channel;
use crate::dates::YearMonth;
use crate::models::Dataset;
use crate::reports::{ReportColumns, Scope};

pub(crate) const RENT_KEYWORD: &str = "希望家賃";

/// First header that names the desired-rent question.
pub fn detect_rent_column(headers: &[String]) -> Option<usize> {
    headers.iter().position(|h| h.contains(RENT_KEYWORD))
}

/// One lead's rent answer with the context shown next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RentResponse {
    pub date: Option<NaiveDate>,
    pub value: Option<u32>,
    pub original: String,
    pub pet_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RentStats {
    pub average: f64,
    /// Upper middle for even counts.
    pub median: u32,
    pub min: u32,
    pub max: u32,
    pub count: usize,
}

impl RentStats {
    pub fn from_values(values: &[u32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let sum: u64 = sorted.iter().map(|v| *v as u64).sum();
        Self {
            average: sum as f64 / sorted.len() as f64,
            median: sorted[sorted.len() / 2],
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            count: sorted.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RentAnalysis {
    pub responses: Vec<RentResponse>,
    pub values: Vec<u32>,
    pub stats: RentStats,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Non-empty price bands in band order.
    pub distribution: Vec<(&'static str, usize)>,
}

/// Rent answers for one channel (or every row when `channel` is `None`) within `scope`.
/// `None` when the dataset has no rent column.
pub fn analyze_rent(
    dataset: &Dataset,
    columns: &ReportColumns,
    strategy: RentStrategy,
    channel: Option<Channel>,
    scope: Scope,
) -> Option<RentAnalysis> {
    let rent_col = detect_rent_column(&dataset.headers)?;

    let responses: Vec<RentResponse> = dataset
        .rows
        .iter()
        .filter(|row| channel.is_none() || columns.row_channel(row) == channel)
        .filter_map(|row| {
            let date = columns.row_date(row);
            if !scope.includes(date) {
                return None;
            }
            let parsed = strategy.parse_scalar(row.get(rent_col));
            Some(RentResponse {
                date,
                value: parsed.value,
                original: parsed.original,
                pet_type: columns.pet.map(|i| row.text(i)).unwrap_or_default(),
            })
        })
        .collect();

    let values: Vec<u32> = responses.iter().filter_map(|r| r.value).collect();
    let stats = RentStats::from_values(&values);

    let mut counts = vec![0usize; BUCKETS.len()];
    for value in &values {
        let bucket = bucket_for(*value);
        if let Some(pos) = BUCKETS.iter().position(|b| b == bucket) {
            counts[pos] += 1;
        }
    }
    let distribution = BUCKETS
        .iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|(b, n)| (b.label, n))
        .collect();

    tracing::debug!(
        channel = channel.map(|c| c.key()).unwrap_or("all"),
        valid = values.len(),
        invalid = responses.len() - values.len(),
        "rent analysis"
    );

    Some(RentAnalysis {
        valid_count: values.len(),
        invalid_count: responses.len() - values.len(),
        responses,
        values,
        stats,
        distribution,
    })
}

// ---------------------------------------------------------------------------
// Overview across months and channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthChannelRent {
    pub month: YearMonth,
    pub channel: Channel,
    pub stats: RentStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RentOverview {
    pub entries: Vec<MonthChannelRent>,
    pub overall_average: f64,
    pub overall_median: u32,
    pub period: Option<(YearMonth, YearMonth)>,
    pub total_responses: usize,
}

pub fn rent_overview(
    dataset: &Dataset,
    columns: &ReportColumns,
    strategy: RentStrategy,
) -> Option<RentOverview> {
    let rent_col = detect_rent_column(&dataset.headers)?;

    let mut months = BTreeSet::new();
    let mut grouped: BTreeMap<(YearMonth, Channel), Vec<u32>> = BTreeMap::new();
    for row in &dataset.rows {
        let Some(date) = columns.row_date(row) else {
            continue;
        };
        let month = YearMonth::of(date);
        months.insert(month);

        let Some(channel) = columns.row_channel(row) else {
            continue;
        };
        if let Some(value) = strategy.parse_scalar(row.get(rent_col)).value {
            grouped.entry((month, channel)).or_default().push(value);
        }
    }

    let mut all_values = Vec::new();
    let entries: Vec<MonthChannelRent> = grouped
        .into_iter()
        .map(|((month, channel), values)| {
            all_values.extend_from_slice(&values);
            MonthChannelRent {
                month,
                channel,
                stats: RentStats::from_values(&values),
            }
        })
        .collect();

    let overall = RentStats::from_values(&all_values);
    let period = match (months.first(), months.last()) {
        (Some(first), Some(last)) => Some((*first, *last)),
        _ => None,
    };

    Some(RentOverview {
        entries,
        overall_average: overall.average,
        overall_median: overall.median,
        period,
        total_responses: overall.count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Row, Scalar};
    use chrono::Utc;

    fn dataset(rows: &[[&str; 4]]) -> Dataset {
        Dataset {
            headers: vec![
                "タイムスタンプ日時".into(),
                "何を見て知った？".into(),
                "希望家賃上限（管理費込）".into(),
                "ペットは何匹？".into(),
            ],
            rows: rows
                .iter()
                .map(|r| Row::new(r.iter().map(|v| Scalar::from_raw(v)).collect()))
                .collect(),
            source: "test.csv".into(),
            ingested_at: Utc::now(),
            checksum: None,
        }
    }

    fn columns(ds: &Dataset) -> ReportColumns {
        ReportColumns::resolve(ds, "タイムスタンプ日時", "何を見て知った？", Some("ペットは何匹？"))
            .unwrap()
    }

    fn sample() -> Dataset {
        dataset(&[
            ["2024-11-02 10:00:00", "Instagram", "15万", "犬1匹"],
            ["2024-11-03 10:00:00", "Instagram", "~100,000円", "猫2匹"],
            ["2024-11-04 10:00:00", "Instagram", "未定", ""],
            ["2024-11-05 10:00:00", "TikTok", "20万", "犬1匹"],
            ["2024-12-01 10:00:00", "Instagram", "~200,000円", "犬1匹"],
            ["2024-12-02 10:00:00", "テレビ", "10万", ""],
        ])
    }

    #[test]
    fn test_detect_rent_column() {
        let headers = vec!["日時".to_string(), "希望家賃(管理費込)".to_string()];
        assert_eq!(detect_rent_column(&headers), Some(1));
        assert_eq!(detect_rent_column(&["家賃".to_string()]), None);
    }

    #[test]
    fn test_stats_median_is_upper_middle() {
        let stats = RentStats::from_values(&[100_000, 150_000, 200_000, 80_000]);
        assert_eq!(stats.median, 150_000);
        assert_eq!(stats.min, 80_000);
        assert_eq!(stats.max, 200_000);
        assert_eq!(stats.average, 132_500.0);
        assert_eq!(RentStats::from_values(&[]), RentStats::default());
    }

    #[test]
    fn test_analyze_channel_month() {
        let ds = sample();
        let month: YearMonth = "2024-11".parse().unwrap();
        let analysis = analyze_rent(
            &ds,
            &columns(&ds),
            RentStrategy::Lookup,
            Some(Channel::Instagram),
            Scope::Month(month),
        )
        .unwrap();
        assert_eq!(analysis.responses.len(), 3);
        assert_eq!(analysis.valid_count, 2);
        assert_eq!(analysis.invalid_count, 1);
        assert_eq!(analysis.stats.average, 125_000.0);
        assert_eq!(analysis.responses[0].pet_type, "犬1匹");
        assert_eq!(
            analysis.distribution,
            vec![("76,000~100,000円", 1), ("126,000~150,000円", 1)]
        );
    }

    #[test]
    fn test_analyze_all_channels_all_time() {
        let ds = sample();
        let analysis =
            analyze_rent(&ds, &columns(&ds), RentStrategy::Lookup, None, Scope::AllTime).unwrap();
        assert_eq!(analysis.responses.len(), 6);
        assert_eq!(analysis.valid_count, 5);
    }

    #[test]
    fn test_analyze_without_rent_column() {
        let mut ds = sample();
        ds.headers[2] = "備考".into();
        let cols = columns(&ds);
        assert!(analyze_rent(&ds, &cols, RentStrategy::Lookup, None, Scope::AllTime).is_none());
        assert!(rent_overview(&ds, &cols, RentStrategy::Lookup).is_none());
    }

    #[test]
    fn test_overview_groups_by_month_then_channel() {
        let ds = sample();
        let overview = rent_overview(&ds, &columns(&ds), RentStrategy::Lookup).unwrap();
        let keys: Vec<(String, Channel)> = overview
            .entries
            .iter()
            .map(|e| (e.month.to_string(), e.channel))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-11".to_string(), Channel::Instagram),
                ("2024-11".to_string(), Channel::TikTok),
                ("2024-12".to_string(), Channel::Instagram),
            ]
        );
        // Unattributed rows are left out of the totals.
        assert_eq!(overview.total_responses, 4);
        assert_eq!(overview.overall_median, 200_000);
        let (start, end) = overview.period.unwrap();
        assert_eq!(start.to_string(), "2024-11");
        assert_eq!(end.to_string(), "2024-12");
    }
}
