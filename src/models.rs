use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::channel::Channel;

/// A single cell. CSV ingestion keeps raw text; typing happens in the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Empty,
}

impl Scalar {
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Scalar::Empty
        } else {
            Scalar::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Empty => true,
            Scalar::Text(s) => s.is_empty(),
            Scalar::Number(_) => false,
        }
    }

    /// Text form used for grouping, display and parsing.
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Scalar::Text(s) => s.clone(),
            Scalar::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row(Vec<Scalar>);

impl Row {
    pub fn new(cells: Vec<Scalar>) -> Self {
        Self(cells)
    }

    pub fn get(&self, index: usize) -> &Scalar {
        static EMPTY: Scalar = Scalar::Empty;
        self.0.get(index).unwrap_or(&EMPTY)
    }

    pub fn text(&self, index: usize) -> String {
        self.get(index).as_text()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn cells(&self) -> &[Scalar] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub source: String,
    pub ingested_at: DateTime<Utc>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Same headers and provenance, different rows.
    pub fn with_rows(&self, rows: Vec<Row>) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows,
            source: self.source.clone(),
            ingested_at: self.ingested_at,
            checksum: self.checksum.clone(),
        }
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Scalar> {
        self.rows.iter().map(move |r| r.get(index))
    }
}

/// Dates stored either as `YYYY-MM-DD` or as full RFC 3339 timestamps
/// (`2024-01-01T00:00:00.000Z`); the latter keep the date in their own offset.
pub fn parse_stored_date(raw: &str) -> Option<NaiveDate> {
    crate::dates::parse_iso_date(raw)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw.trim()).ok().map(|dt| dt.date_naive()))
}

fn stored_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_stored_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
}

/// Daily ad spend and contracts entered for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAdCost {
    pub id: String,
    #[serde(deserialize_with = "stored_date")]
    pub date: NaiveDate,
    #[serde(rename = "mediaType")]
    pub channel: Channel,
    pub cost: f64,
    pub contract_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Campaign-level spend over a date range, without a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCost {
    pub id: String,
    #[serde(deserialize_with = "stored_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "stored_date")]
    pub end_date: NaiveDate,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn new_record_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{suffix:08x}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_from_raw() {
        assert_eq!(Scalar::from_raw("  "), Scalar::Empty);
        assert_eq!(Scalar::from_raw("abc"), Scalar::Text("abc".into()));
    }

    #[test]
    fn test_scalar_number_text() {
        assert_eq!(Scalar::Number(150000.0).as_text(), "150000");
        assert_eq!(Scalar::Number(8.5).as_text(), "8.5");
        assert_eq!(Scalar::Empty.as_text(), "");
    }

    #[test]
    fn test_scalar_json_shape() {
        let cells = vec![
            Scalar::Number(1.5),
            Scalar::Text("x".into()),
            Scalar::Empty,
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[1.5,"x",null]"#);
        let back: Vec<Scalar> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
    }

    #[test]
    fn test_row_get_out_of_range_is_empty() {
        let row = Row::new(vec![Scalar::Text("a".into())]);
        assert_eq!(row.get(5), &Scalar::Empty);
    }

    #[test]
    fn test_daily_ad_cost_storage_field_names() {
        let cost = DailyAdCost {
            id: "1".into(),
            date: NaiveDate::from_ymd_opt(2024, 11, 2).unwrap(),
            channel: Channel::Instagram,
            cost: 5000.0,
            contract_count: 1,
            note: None,
        };
        let json = serde_json::to_string(&cost).unwrap();
        assert!(json.contains(r#""mediaType":"Instagram""#), "got: {json}");
        assert!(json.contains(r#""contractCount":1"#), "got: {json}");
        assert!(json.contains(r#""date":"2024-11-02""#), "got: {json}");
    }

    #[test]
    fn test_parse_stored_date_accepts_iso_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(parse_stored_date("2024-01-01"), Some(day));
        assert_eq!(parse_stored_date("2024-01-01T00:00:00.000Z"), Some(day));
        assert_eq!(parse_stored_date("2024-01-01T23:30:00+09:00"), Some(day));
        assert_eq!(parse_stored_date("January"), None);
    }

    #[test]
    fn test_ad_cost_reads_timestamp_dates() {
        let json = r#"{"id":"x","startDate":"2024-01-01T00:00:00.000Z","endDate":"2024-01-02T00:00:00.000Z","cost":100}"#;
        let cost: AdCost = serde_json::from_str(json).unwrap();
        assert_eq!(cost.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(cost.end_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(serde_json::from_str::<AdCost>(&json.replace("2024-01-01T", "bad")).is_err());
    }

    #[test]
    fn test_record_ids_are_unique() {
        assert_ne!(new_record_id(), new_record_id());
    }
}
