use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadError, Result};
use crate::rent::RentStrategy;
use crate::sheets::DEFAULT_SPREADSHEET_ID;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub rent_strategy: RentStrategy,
    /// Overrides date-column detection when set.
    #[serde(default)]
    pub date_column: Option<String>,
    #[serde(default = "default_channel_column")]
    pub channel_column: String,
    #[serde(default = "default_pet_column")]
    pub pet_column: String,
    #[serde(default = "default_spreadsheet_id")]
    pub spreadsheet_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_channel_column() -> String {
    "何を見て知った？".to_string()
}

fn default_pet_column() -> String {
    "ペットは何匹？".to_string()
}

fn default_spreadsheet_id() -> String {
    DEFAULT_SPREADSHEET_ID.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            rent_strategy: RentStrategy::default(),
            date_column: None,
            channel_column: default_channel_column(),
            pet_column: default_pet_column(),
            spreadsheet_id: default_spreadsheet_id(),
            log_level: default_log_level(),
        }
    }
}

/// Keys accepted by `leadstats config set`.
pub const KEYS: [&str; 7] = [
    "data_dir",
    "rent_strategy",
    "date_column",
    "channel_column",
    "pet_column",
    "spreadsheet_id",
    "log_level",
];

impl Settings {
    /// Update one field from its textual form. An empty `date_column` clears the override.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "data_dir" => self.data_dir = shellexpand_path(value),
            "rent_strategy" => self.rent_strategy = value.parse()?,
            "date_column" => {
                self.date_column = (!value.is_empty()).then(|| value.to_string());
            }
            "channel_column" => self.channel_column = non_empty(key, value)?,
            "pet_column" => self.pet_column = non_empty(key, value)?,
            "spreadsheet_id" => self.spreadsheet_id = non_empty(key, value)?,
            "log_level" => {
                tracing_subscriber::EnvFilter::try_new(value)
                    .map_err(|e| LeadError::Settings(format!("log_level: {e}")))?;
                self.log_level = value.to_string();
            }
            other => {
                return Err(LeadError::Settings(format!(
                    "unknown key '{other}' (expected one of: {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// `(key, value)` pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data_dir", self.data_dir.clone()),
            ("rent_strategy", self.rent_strategy.to_string()),
            ("date_column", self.date_column.clone().unwrap_or_default()),
            ("channel_column", self.channel_column.clone()),
            ("pet_column", self.pet_column.clone()),
            ("spreadsheet_id", self.spreadsheet_id.clone()),
            ("log_level", self.log_level.clone()),
        ]
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(LeadError::Settings(format!("{key} cannot be empty")));
    }
    Ok(value.to_string())
}

pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("leadstats")
        .join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("leadstats")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
        Settings::default()
    })
}

fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LeadError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
