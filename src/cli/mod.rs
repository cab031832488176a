pub mod ads;
pub mod config;
pub mod costs;
pub mod load;
pub mod report;
pub mod stats;
pub mod status;

use clap::{Args, Parser, Subcommand};

use crate::error::{LeadError, Result};
use crate::filter::{self, DateFilter};
use crate::models::Dataset;
use crate::reports::ReportColumns;
use crate::settings::Settings;
use crate::storage::{self, SqliteStore};

#[derive(Parser)]
#[command(
    name = "leadstats",
    version,
    about = "Lead-generation analytics for pet-friendly rental inquiry forms."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a CSV export (Shift-JIS or UTF-8) as the current dataset.
    Load {
        /// Path to the CSV file
        file: String,
    },
    /// Download the inquiry spreadsheet and store it as the current dataset.
    Fetch {
        /// Spreadsheet ID (default: the configured one)
        #[arg(long = "spreadsheet-id")]
        spreadsheet_id: Option<String>,
    },
    /// Show the stored dataset and settings.
    Status,
    /// Remove the stored dataset.
    Clear,
    /// List months that have dated responses, newest first.
    Months,
    /// Column statistics. Without a column, summarize every column.
    Stats {
        /// Column name
        column: Option<String>,
        /// Number of most frequent values to show
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Show rent answers in normalized form
        #[arg(long = "normalize-rent")]
        normalize_rent: bool,
        #[command(flatten)]
        dates: DateArgs,
    },
    /// Channel reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Daily advertising cost and contract records per channel.
    Costs {
        #[command(subcommand)]
        command: CostsCommands,
    },
    /// Date-range campaign costs and their response performance.
    Ads {
        #[command(subcommand)]
        command: AdsCommands,
    },
    /// Show settings, or change one with `config set <key> <value>`.
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Month: YYYY-MM
    #[arg(long)]
    pub month: Option<String>,
    /// Start date: YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub from: Option<String>,
    /// End date: YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub to: Option<String>,
}

impl DateArgs {
    pub fn filter(&self) -> Result<DateFilter> {
        DateFilter::from_flags(self.month.as_deref(), self.from.as_deref(), self.to.as_deref())
    }
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Leads, costs and contracts per channel for one month.
    Monthly {
        /// Month: YYYY-MM
        month: String,
    },
    /// Per-channel totals over the whole dataset.
    AllTime,
    /// Day-by-day leads and costs for one channel in a month.
    Daily {
        /// Month: YYYY-MM
        month: String,
        /// Channel name or key (e.g. instagram)
        channel: String,
    },
    /// Hours, pet types and rent for one channel.
    Detailed {
        /// Channel name or key
        channel: String,
        /// Restrict to a month: YYYY-MM
        #[arg(long, conflicts_with = "day")]
        month: Option<String>,
        /// Restrict to a day: YYYY-MM-DD
        #[arg(long)]
        day: Option<String>,
    },
    /// Desired-rent statistics and price bands.
    Rent {
        /// Only this channel
        #[arg(long)]
        channel: Option<String>,
        /// Restrict to a month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Average and median rent by month and channel.
    RentOverview,
    /// Responses per month with month-over-month change.
    Responses,
}

#[derive(Subcommand)]
pub enum CostsCommands {
    /// Record cost and contracts for one channel on one day.
    Set {
        /// Date: YYYY-MM-DD
        date: String,
        /// Channel name or key
        channel: String,
        /// Ad cost in yen
        cost: f64,
        /// Contracts signed that day
        #[arg(long, default_value_t = 0)]
        contracts: u32,
        #[arg(long)]
        note: Option<String>,
    },
    /// Replace a whole month for one channel from a CSV (date,cost,contracts,note).
    Save {
        /// Month: YYYY-MM
        month: String,
        /// Channel name or key
        channel: String,
        /// CSV file with one row per day
        file: String,
    },
    /// List stored cost records.
    List {
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Channel name or key
        #[arg(long)]
        channel: Option<String>,
    },
    /// Delete a cost record by ID.
    Remove {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AdsCommands {
    /// Record a campaign cost over a date range.
    Add {
        /// Start date: YYYY-MM-DD
        start: String,
        /// End date: YYYY-MM-DD (inclusive)
        end: String,
        /// Total cost in yen
        cost: f64,
        #[arg(long)]
        description: Option<String>,
    },
    /// List campaigns with responses and cost per response.
    List,
    /// Delete a campaign by ID.
    Remove {
        id: String,
    },
    /// Delete every campaign.
    Clear,
    /// Combined performance across all campaigns.
    Total,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Change one setting.
    Set {
        key: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStore> {
    SqliteStore::open(&settings.data_path())
}

pub(crate) fn require_dataset(store: &SqliteStore) -> Result<Dataset> {
    storage::load_dataset(store).ok_or(LeadError::NoDataset)
}

pub(crate) fn date_column(dataset: &Dataset, settings: &Settings) -> Result<usize> {
    filter::resolve_date_column(dataset, settings.date_column.as_deref())
}

pub(crate) fn report_columns(dataset: &Dataset, settings: &Settings) -> Result<ReportColumns> {
    let date = date_column(dataset, settings)?;
    ReportColumns::resolve(
        dataset,
        &dataset.headers[date],
        &settings.channel_column,
        Some(&settings.pet_column),
    )
}
