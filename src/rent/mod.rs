pub mod analysis;
pub mod buckets;
pub mod table;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LeadError;
use crate::models::{Dataset, Row, Scalar};

pub use analysis::{analyze_rent, detect_rent_column, rent_overview, RentAnalysis, RentOverview};

/// Value reported for open-ended answers such as `401,000円~`.
pub const OPEN_ENDED_CEILING: u32 = 500_000;

/// Result of reading one rent answer. `value` is the yen upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentParse {
    pub value: Option<u32>,
    pub original: String,
    pub bucket: Option<&'static str>,
}

impl RentParse {
    pub(crate) fn valid(raw: &str, value: u32) -> Self {
        Self {
            value: Some(value),
            original: raw.to_string(),
            bucket: None,
        }
    }

    pub(crate) fn invalid(raw: &str) -> Self {
        Self {
            value: None,
            original: raw.to_string(),
            bucket: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Text that parses back to the same value under the same strategy.
    /// Invalid answers keep their original text.
    pub fn normalized_text(&self) -> String {
        match (self.bucket, self.value) {
            (Some(label), _) => label.to_string(),
            (None, Some(value)) => table::render(value),
            (None, None) => self.original.trim().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentStrategy {
    /// Observed-answer table plus `~N円` style fallbacks.
    #[default]
    Lookup,
    /// Numeric extraction snapped to fixed price bands.
    Buckets,
}

impl RentStrategy {
    pub fn parse(&self, raw: &str) -> RentParse {
        match self {
            RentStrategy::Lookup => table::parse(raw),
            RentStrategy::Buckets => buckets::parse(raw),
        }
    }

    pub fn parse_scalar(&self, cell: &Scalar) -> RentParse {
        match cell {
            Scalar::Number(n) if *n > 0.0 && self == &RentStrategy::Buckets => {
                buckets::from_amount(&cell.as_text(), n.round() as u64)
            }
            _ => self.parse(&cell.as_text()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RentStrategy::Lookup => "lookup",
            RentStrategy::Buckets => "buckets",
        }
    }
}

impl fmt::Display for RentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RentStrategy {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lookup" | "table" => Ok(RentStrategy::Lookup),
            "buckets" | "bucket" | "ranges" => Ok(RentStrategy::Buckets),
            other => Err(LeadError::Settings(format!(
                "unknown rent strategy '{other}' (expected lookup or buckets)"
            ))),
        }
    }
}

/// Derive a dataset whose rent columns carry normalized text instead of the raw answers.
pub fn normalize_rent_columns(dataset: &Dataset, strategy: RentStrategy) -> Dataset {
    let rent_columns: Vec<usize> = dataset
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(analysis::RENT_KEYWORD))
        .map(|(i, _)| i)
        .collect();
    if rent_columns.is_empty() {
        return dataset.clone();
    }

    let rows = dataset
        .rows
        .iter()
        .map(|row| {
            let cells = row
                .cells()
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if rent_columns.contains(&i) && !cell.is_empty() {
                        Scalar::Text(strategy.parse_scalar(cell).normalized_text())
                    } else {
                        cell.clone()
                    }
                })
                .collect();
            Row::new(cells)
        })
        .collect();
    dataset.with_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dataset(values: &[&str]) -> Dataset {
        Dataset {
            headers: vec!["名前".into(), "希望家賃上限（管理費込）".into()],
            rows: values
                .iter()
                .map(|v| Row::new(vec![Scalar::from_raw("a"), Scalar::from_raw(v)]))
                .collect(),
            source: "test.csv".into(),
            ingested_at: Utc::now(),
            checksum: None,
        }
    }

    #[test]
    fn test_strategy_dispatch() {
        assert_eq!(RentStrategy::Lookup.parse("~150,000円").value, Some(150_000));
        assert_eq!(RentStrategy::Buckets.parse("15万").value, Some(150_000));
        assert_eq!(
            RentStrategy::Buckets.parse("15万").bucket,
            Some("126,000~150,000円")
        );
    }

    #[test]
    fn test_strategies_disagree_on_ranges_only_in_rounding() {
        // Lookup reports the exact upper bound, buckets snap to the band ceiling.
        assert_eq!(RentStrategy::Lookup.parse("210,000~240,000円").value, Some(240_000));
        assert_eq!(RentStrategy::Buckets.parse("210,000~240,000円").value, Some(250_000));
    }

    #[test]
    fn test_normalized_text_is_idempotent() {
        let samples = ["15万", "~150,000円", "401,000円~", "8万円くらい", "１５～１８万", "未定"];
        for strategy in [RentStrategy::Lookup, RentStrategy::Buckets] {
            for raw in samples {
                let once = strategy.parse(raw);
                let twice = strategy.parse(&once.normalized_text());
                assert_eq!(once.value, twice.value, "{strategy} {raw}");
                assert_eq!(once.normalized_text(), twice.normalized_text(), "{strategy} {raw}");
            }
        }
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("lookup".parse::<RentStrategy>().unwrap(), RentStrategy::Lookup);
        assert_eq!("Buckets".parse::<RentStrategy>().unwrap(), RentStrategy::Buckets);
        assert!("median".parse::<RentStrategy>().is_err());
    }

    #[test]
    fn test_number_cells_use_amount_directly() {
        let parsed = RentStrategy::Buckets.parse_scalar(&Scalar::Number(150000.0));
        assert_eq!(parsed.value, Some(150_000));
        let parsed = RentStrategy::Lookup.parse_scalar(&Scalar::Number(150000.0));
        assert_eq!(parsed.value, Some(150_000));
    }

    #[test]
    fn test_normalize_rent_columns_only_touches_rent() {
        let ds = dataset(&["15万", "", "未定"]);
        let out = normalize_rent_columns(&ds, RentStrategy::Lookup);
        assert_eq!(out.rows[0].text(0), "a");
        assert_eq!(out.rows[0].text(1), "~150,000円");
        assert_eq!(out.rows[1].get(1), &Scalar::Empty);
        assert_eq!(out.rows[2].text(1), "未定");
        assert_eq!(out.headers, ds.headers);
    }
}
