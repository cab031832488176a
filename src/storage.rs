#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::dates::YearMonth;
use crate::db;
use crate::error::{LeadError, Result};
use crate::models::{AdCost, DailyAdCost, Dataset};

pub const DATASET_KEY: &str = "csv-stats-viewer-data";
pub const AD_COSTS_KEY: &str = "csv-stats-viewer-ad-costs";
pub const DAILY_COSTS_KEY: &str = "csv-stats-media-ad-costs";

pub const STORAGE_VERSION: &str = "1.0";
pub const MAX_SNAPSHOT_BYTES: usize = 5 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// String key-value persistence. Analytics never touch this; CLI flows do.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let conn = db::get_connection(&db::db_path(data_dir))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        db::init_db(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Versioned envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    version: String,
    #[serde(alias = "csvData", alias = "adCosts")]
    payload: T,
    saved_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeHeader {
    version: String,
    saved_at: Option<DateTime<Utc>>,
}

enum Loaded<T> {
    Hit(T),
    Miss,
    StaleVersion(String),
}

/// Read an envelope; unreadable entries are logged and reported as a miss.
fn read_envelope<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Loaded<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Loaded::Miss,
        Err(e) => {
            tracing::warn!(key, error = %e, "storage read failed");
            return Loaded::Miss;
        }
    };
    match serde_json::from_str::<EnvelopeHeader>(&raw) {
        Ok(header) if header.version != STORAGE_VERSION => {
            return Loaded::StaleVersion(header.version)
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(key, error = %e, "corrupt storage entry");
            return Loaded::Miss;
        }
    }
    match serde_json::from_str::<Envelope<T>>(&raw) {
        Ok(envelope) => Loaded::Hit(envelope.payload),
        Err(e) => {
            tracing::warn!(key, error = %e, "corrupt storage entry");
            Loaded::Miss
        }
    }
}

fn envelope_json<T: Serialize>(payload: &T) -> Result<String> {
    let envelope = Envelope {
        version: STORAGE_VERSION.to_string(),
        payload,
        saved_at: Utc::now(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

// ---------------------------------------------------------------------------
// Dataset snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StorageInfo {
    pub exists: bool,
    pub size: usize,
    pub saved_at: Option<DateTime<Utc>>,
}

/// Persist the dataset snapshot. Returns the stored size in bytes.
pub fn save_dataset(store: &dyn KeyValueStore, dataset: &Dataset) -> Result<usize> {
    let json = envelope_json(dataset)?;
    if json.len() > MAX_SNAPSHOT_BYTES {
        return Err(LeadError::SnapshotTooLarge {
            size: json.len(),
            limit: MAX_SNAPSHOT_BYTES,
        });
    }
    store.set(DATASET_KEY, &json)?;
    tracing::info!(bytes = json.len(), rows = dataset.rows.len(), "saved dataset snapshot");
    Ok(json.len())
}

pub fn load_dataset(store: &dyn KeyValueStore) -> Option<Dataset> {
    match read_envelope::<Dataset>(store, DATASET_KEY) {
        Loaded::Hit(dataset) => Some(dataset),
        Loaded::Miss => None,
        Loaded::StaleVersion(version) => {
            tracing::warn!(%version, "discarding snapshot from another storage version");
            if let Err(e) = store.remove(DATASET_KEY) {
                tracing::warn!(error = %e, "could not remove stale snapshot");
            }
            None
        }
    }
}

pub fn clear_dataset(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(DATASET_KEY)
}

pub fn storage_info(store: &dyn KeyValueStore) -> StorageInfo {
    let missing = StorageInfo {
        exists: false,
        size: 0,
        saved_at: None,
    };
    let Ok(Some(raw)) = store.get(DATASET_KEY) else {
        return missing;
    };
    match serde_json::from_str::<EnvelopeHeader>(&raw) {
        Ok(header) => StorageInfo {
            exists: true,
            size: raw.len(),
            saved_at: header.saved_at,
        },
        Err(_) => missing,
    }
}

// ---------------------------------------------------------------------------
// Campaign costs (date-range)
// ---------------------------------------------------------------------------

pub fn load_ad_costs(store: &dyn KeyValueStore) -> Vec<AdCost> {
    match read_envelope::<Vec<AdCost>>(store, AD_COSTS_KEY) {
        Loaded::Hit(costs) => costs,
        Loaded::Miss => Vec::new(),
        Loaded::StaleVersion(version) => {
            tracing::warn!(%version, "ignoring ad costs from another storage version");
            Vec::new()
        }
    }
}

pub fn save_ad_costs(store: &dyn KeyValueStore, costs: &[AdCost]) -> Result<()> {
    store.set(AD_COSTS_KEY, &envelope_json(&costs)?)
}

pub fn add_ad_cost(store: &dyn KeyValueStore, cost: AdCost) -> Result<()> {
    let mut costs = load_ad_costs(store);
    costs.push(cost);
    save_ad_costs(store, &costs)
}

/// Returns whether a record with `id` existed.
pub fn remove_ad_cost(store: &dyn KeyValueStore, id: &str) -> Result<bool> {
    let mut costs = load_ad_costs(store);
    let before = costs.len();
    costs.retain(|c| c.id != id);
    save_ad_costs(store, &costs)?;
    Ok(costs.len() != before)
}

pub fn clear_ad_costs(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(AD_COSTS_KEY)
}

// ---------------------------------------------------------------------------
// Daily channel costs (bare array, no envelope)
// ---------------------------------------------------------------------------

pub fn load_daily_costs(store: &dyn KeyValueStore) -> Vec<DailyAdCost> {
    let raw = match store.get(DAILY_COSTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "storage read failed");
            return Vec::new();
        }
    };
    let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "corrupt daily cost entry");
            return Vec::new();
        }
    };
    // One bad record must not take the rest down with it.
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<DailyAdCost>(value) {
            Ok(cost) => Some(cost),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable daily cost record");
                None
            }
        })
        .collect()
}

pub fn save_daily_costs(store: &dyn KeyValueStore, costs: &[DailyAdCost]) -> Result<()> {
    store.set(DAILY_COSTS_KEY, &serde_json::to_string(costs)?)
}

pub fn daily_costs_for(
    store: &dyn KeyValueStore,
    month: Option<YearMonth>,
    channel: Option<Channel>,
) -> Vec<DailyAdCost> {
    load_daily_costs(store)
        .into_iter()
        .filter(|c| month.map_or(true, |m| m.contains(c.date)))
        .filter(|c| channel.map_or(true, |ch| c.channel == ch))
        .collect()
}

/// Replace every record of `(month, channel)` with `entries`. Entries without
/// cost or contracts are dropped, as are entries outside the pair.
/// Returns the number of records kept.
pub fn replace_month_costs(
    store: &dyn KeyValueStore,
    month: YearMonth,
    channel: Channel,
    entries: Vec<DailyAdCost>,
) -> Result<usize> {
    let mut costs = load_daily_costs(store);
    costs.retain(|c| !(c.channel == channel && month.contains(c.date)));

    let kept: Vec<DailyAdCost> = entries
        .into_iter()
        .filter(|e| e.channel == channel && month.contains(e.date))
        .filter(|e| e.cost > 0.0 || e.contract_count > 0)
        .collect();
    let count = kept.len();
    costs.extend(kept);
    costs.sort_by(|a, b| a.date.cmp(&b.date).then(a.channel.cmp(&b.channel)));

    save_daily_costs(store, &costs)?;
    tracing::info!(%month, channel = channel.key(), records = count, "saved daily costs");
    Ok(count)
}

pub fn remove_daily_cost(store: &dyn KeyValueStore, id: &str) -> Result<bool> {
    let mut costs = load_daily_costs(store);
    let before = costs.len();
    costs.retain(|c| c.id != id);
    save_daily_costs(store, &costs)?;
    Ok(costs.len() != before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Row, Scalar};
    use chrono::NaiveDate;

    fn dataset(rows: usize, cell: &str) -> Dataset {
        Dataset {
            headers: vec!["日時".into(), "メモ".into()],
            rows: (0..rows)
                .map(|_| Row::new(vec![Scalar::from_raw("2024-11-02"), Scalar::from_raw(cell)]))
                .collect(),
            source: "test.csv".into(),
            ingested_at: Utc::now(),
            checksum: Some("abc".into()),
        }
    }

    fn daily(id: &str, date: &str, channel: Channel, cost: f64, contracts: u32) -> DailyAdCost {
        DailyAdCost {
            id: id.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            channel,
            cost,
            contract_count: contracts,
            note: None,
        }
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_sqlite_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SqliteStore::open(dir.path()).unwrap();
            save_dataset(&store, &dataset(3, "x")).unwrap();
        }
        let store = SqliteStore::open(dir.path()).unwrap();
        let loaded = load_dataset(&store).unwrap();
        assert_eq!(loaded.rows.len(), 3);
        assert_eq!(loaded.checksum.as_deref(), Some("abc"));
    }

    #[test]
    fn test_dataset_roundtrip_and_info() {
        let store = MemoryStore::new();
        assert!(!storage_info(&store).exists);
        let ds = dataset(2, "");
        let size = save_dataset(&store, &ds).unwrap();
        let info = storage_info(&store);
        assert!(info.exists);
        assert_eq!(info.size, size);
        assert!(info.saved_at.is_some());
        let loaded = load_dataset(&store).unwrap();
        assert_eq!(loaded.headers, ds.headers);
        assert_eq!(loaded.rows[0].get(1), &Scalar::Empty);
    }

    #[test]
    fn test_oversized_snapshot_refused() {
        let store = MemoryStore::new();
        let big = "x".repeat(1024);
        let ds = dataset(6 * 1024, &big);
        let err = save_dataset(&store, &ds).unwrap_err();
        assert!(matches!(err, LeadError::SnapshotTooLarge { .. }));
        assert!(store.get(DATASET_KEY).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_discards_snapshot() {
        let store = MemoryStore::new();
        store
            .set(
                DATASET_KEY,
                r#"{"version":"0.9","payload":{},"savedAt":"2024-01-01T00:00:00Z"}"#,
            )
            .unwrap();
        assert!(load_dataset(&store).is_none());
        assert!(store.get(DATASET_KEY).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entries_are_misses() {
        let store = MemoryStore::new();
        store.set(DATASET_KEY, "{not json").unwrap();
        store.set(AD_COSTS_KEY, "[]").unwrap();
        store.set(DAILY_COSTS_KEY, "{}").unwrap();
        assert!(load_dataset(&store).is_none());
        assert!(load_ad_costs(&store).is_empty());
        assert!(load_daily_costs(&store).is_empty());
    }

    #[test]
    fn test_ad_cost_lifecycle() {
        let store = MemoryStore::new();
        let cost = AdCost {
            id: "a1".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            cost: 50_000.0,
            description: Some("January flyer".into()),
        };
        add_ad_cost(&store, cost.clone()).unwrap();
        assert_eq!(load_ad_costs(&store), vec![cost]);
        let raw = store.get(AD_COSTS_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""startDate":"2024-01-01""#), "got: {raw}");
        assert!(remove_ad_cost(&store, "a1").unwrap());
        assert!(!remove_ad_cost(&store, "a1").unwrap());
        clear_ad_costs(&store).unwrap();
        assert!(load_ad_costs(&store).is_empty());
    }

    #[test]
    fn test_reads_legacy_payload_field_names() {
        let store = MemoryStore::new();
        store
            .set(
                AD_COSTS_KEY,
                r#"{"version":"1.0","adCosts":[{"id":"x","startDate":"2024-01-01T00:00:00.000Z","endDate":"2024-01-02T00:00:00.000Z","cost":100,"description":"flyer"}],"savedAt":"2024-01-01T00:00:00.000Z"}"#,
            )
            .unwrap();
        let costs = load_ad_costs(&store);
        assert_eq!(costs.len(), 1);
        assert_eq!(costs[0].start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(costs[0].end_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_replace_month_costs_only_touches_pair() {
        let store = MemoryStore::new();
        save_daily_costs(
            &store,
            &[
                daily("1", "2024-11-01", Channel::Instagram, 1_000.0, 0),
                daily("2", "2024-11-02", Channel::Instagram, 2_000.0, 1),
                daily("3", "2024-11-02", Channel::TikTok, 3_000.0, 0),
                daily("4", "2024-12-01", Channel::Instagram, 4_000.0, 0),
            ],
        )
        .unwrap();

        let kept = replace_month_costs(
            &store,
            ym("2024-11"),
            Channel::Instagram,
            vec![
                daily("5", "2024-11-03", Channel::Instagram, 5_000.0, 0),
                daily("6", "2024-11-04", Channel::Instagram, 0.0, 0),
                daily("7", "2024-11-05", Channel::Instagram, 0.0, 2),
            ],
        )
        .unwrap();
        assert_eq!(kept, 2);

        let ids: Vec<String> = load_daily_costs(&store).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["3", "5", "7", "4"]);

        let raw = store.get(DAILY_COSTS_KEY).unwrap().unwrap();
        assert!(raw.starts_with('['), "daily costs are a bare array");
    }

    #[test]
    fn test_bad_daily_record_keeps_the_rest() {
        let store = MemoryStore::new();
        store
            .set(
                DAILY_COSTS_KEY,
                r#"[
                    {"id":"1","date":"2024-11-01","mediaType":"Instagram","cost":1000,"contractCount":0},
                    {"id":"2","date":"2024-11-02","mediaType":"Radio","cost":2000,"contractCount":0},
                    {"id":"3","date":"2024-11-03","mediaType":"TikTok","cost":3000},
                    {"id":"4","date":"2024-11-04","mediaType":"TikTok","cost":4000,"contractCount":2}
                ]"#,
            )
            .unwrap();
        let ids: Vec<String> = load_daily_costs(&store).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["1", "4"]);

        replace_month_costs(&store, ym("2024-12"), Channel::Line, Vec::new()).unwrap();
        assert_eq!(load_daily_costs(&store).len(), 2);
    }

    #[test]
    fn test_daily_costs_for_filters() {
        let store = MemoryStore::new();
        save_daily_costs(
            &store,
            &[
                daily("1", "2024-11-01", Channel::Instagram, 1_000.0, 0),
                daily("2", "2024-11-02", Channel::TikTok, 2_000.0, 0),
                daily("3", "2024-12-01", Channel::Instagram, 3_000.0, 0),
            ],
        )
        .unwrap();
        assert_eq!(daily_costs_for(&store, Some(ym("2024-11")), None).len(), 2);
        assert_eq!(daily_costs_for(&store, None, Some(Channel::Instagram)).len(), 2);
        assert_eq!(
            daily_costs_for(&store, Some(ym("2024-11")), Some(Channel::TikTok)).len(),
            1
        );
        assert!(remove_daily_cost(&store, "2").unwrap());
        assert_eq!(load_daily_costs(&store).len(), 2);
    }
}
