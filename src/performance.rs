use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::dates;
use crate::models::{AdCost, Dataset};

#[derive(Debug, Clone, PartialEq)]
pub struct AdPerformance {
    pub period: String,
    pub total_cost: f64,
    pub responses: usize,
    pub cost_per_response: f64,
    /// Responses per day inside the window, ascending by date.
    pub daily: Vec<(NaiveDate, usize)>,
}

fn period_label(start: NaiveDate, end: NaiveDate) -> String {
    let day = |d: NaiveDate| format!("{}/{}/{}", d.year(), d.month(), d.day());
    format!("{} 〜 {}", day(start), day(end))
}

fn window_performance(
    dataset: &Dataset,
    date_column: usize,
    start: NaiveDate,
    end: NaiveDate,
    cost: f64,
) -> AdPerformance {
    let from = dates::start_of_day(start);
    let until = dates::end_of_day(end);

    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for value in dataset.column_values(date_column) {
        let Some(stamp) = dates::parse_timestamp(&value.as_text()) else {
            continue;
        };
        if stamp >= from && stamp <= until {
            *daily.entry(stamp.date()).or_default() += 1;
        }
    }
    let responses: usize = daily.values().sum();

    AdPerformance {
        period: period_label(start, end),
        total_cost: cost,
        responses,
        cost_per_response: if responses > 0 {
            cost / responses as f64
        } else {
            0.0
        },
        daily: daily.into_iter().collect(),
    }
}

/// Responses received while one campaign ran, end date inclusive.
pub fn ad_performance(dataset: &Dataset, date_column: usize, cost: &AdCost) -> AdPerformance {
    window_performance(dataset, date_column, cost.start_date, cost.end_date, cost.cost)
}

/// All campaigns combined over the span from the earliest to the latest date they mention.
pub fn total_ad_performance(
    dataset: &Dataset,
    date_column: usize,
    costs: &[AdCost],
) -> Option<AdPerformance> {
    let bounds = costs.iter().flat_map(|c| [c.start_date, c.end_date]);
    let start = bounds.clone().min()?;
    let end = bounds.max()?;
    let total: f64 = costs.iter().map(|c| c.cost).sum();
    Some(window_performance(dataset, date_column, start, end, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Row, Scalar};
    use chrono::Utc;

    fn dataset(values: &[&str]) -> Dataset {
        Dataset {
            headers: vec!["日時".into()],
            rows: values
                .iter()
                .map(|v| Row::new(vec![Scalar::from_raw(v)]))
                .collect(),
            source: "test.csv".into(),
            ingested_at: Utc::now(),
            checksum: None,
        }
    }

    fn campaign(start: &str, end: &str, cost: f64) -> AdCost {
        AdCost {
            id: format!("{start}-{end}"),
            start_date: dates::parse_iso_date(start).unwrap(),
            end_date: dates::parse_iso_date(end).unwrap(),
            cost,
            description: None,
        }
    }

    #[test]
    fn test_single_day_window_is_inclusive() {
        let ds = dataset(&[
            "2024-01-10 23:00:00",
            "2024-01-11 00:00:00",
            "2024-01-10 00:00:00",
            "2024-01-09 23:59:59",
        ]);
        let perf = ad_performance(&ds, 0, &campaign("2024-01-10", "2024-01-10", 10_000.0));
        assert_eq!(perf.responses, 2);
        assert_eq!(perf.cost_per_response, 5_000.0);
        assert_eq!(perf.period, "2024/1/10 〜 2024/1/10");
        assert_eq!(
            perf.daily,
            vec![(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(), 2)]
        );
    }

    #[test]
    fn test_daily_series_sorted() {
        let ds = dataset(&["2024-01-12 10:00:00", "2024-01-10 10:00:00", "2024-01-12 11:00:00", "x"]);
        let perf = ad_performance(&ds, 0, &campaign("2024-01-01", "2024-01-31", 3_000.0));
        let days: Vec<u32> = perf.daily.iter().map(|(d, _)| d.day()).collect();
        assert_eq!(days, vec![10, 12]);
        assert_eq!(perf.responses, 3);
    }

    #[test]
    fn test_no_responses_costs_zero_per_response() {
        let ds = dataset(&["2023-01-01"]);
        let perf = ad_performance(&ds, 0, &campaign("2024-01-01", "2024-01-31", 3_000.0));
        assert_eq!(perf.responses, 0);
        assert_eq!(perf.cost_per_response, 0.0);
    }

    #[test]
    fn test_total_spans_all_campaigns() {
        let ds = dataset(&["2024-01-05", "2024-02-20", "2024-03-01"]);
        let costs = vec![
            campaign("2024-02-01", "2024-02-28", 20_000.0),
            campaign("2024-01-01", "2024-01-15", 10_000.0),
        ];
        let perf = total_ad_performance(&ds, 0, &costs).unwrap();
        assert_eq!(perf.total_cost, 30_000.0);
        assert_eq!(perf.responses, 2);
        assert_eq!(perf.period, "2024/1/1 〜 2024/2/28");
        assert!(total_ad_performance(&ds, 0, &[]).is_none());
    }
}
