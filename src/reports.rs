use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::channel::{normalize_channel, Channel};
use crate::dates::{self, YearMonth};
use crate::error::{LeadError, Result};
use crate::models::{DailyAdCost, Dataset, Row};

// ---------------------------------------------------------------------------
// Scope and column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Day(NaiveDate),
    Month(YearMonth),
    AllTime,
}

impl Scope {
    /// Undated rows only belong to the all-time scope.
    pub fn includes(&self, date: Option<NaiveDate>) -> bool {
        match (self, date) {
            (Scope::AllTime, _) => true,
            (Scope::Day(day), Some(d)) => *day == d,
            (Scope::Month(month), Some(d)) => month.contains(d),
            (_, None) => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Day(d) => d.format("%Y-%m-%d").to_string(),
            Scope::Month(m) => m.to_string(),
            Scope::AllTime => "all time".to_string(),
        }
    }
}

/// Column positions the channel reports read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportColumns {
    pub date: usize,
    pub channel: usize,
    pub pet: Option<usize>,
}

impl ReportColumns {
    pub fn resolve(
        dataset: &Dataset,
        date: &str,
        channel: &str,
        pet: Option<&str>,
    ) -> Result<Self> {
        let date = dataset
            .column(date)
            .ok_or_else(|| LeadError::MissingColumn(date.to_string()))?;
        let channel = dataset
            .column(channel)
            .ok_or_else(|| LeadError::MissingColumn(channel.to_string()))?;
        let pet = pet.and_then(|name| dataset.column(name));
        Ok(Self { date, channel, pet })
    }

    pub fn row_date(&self, row: &Row) -> Option<NaiveDate> {
        dates::parse_date(&row.text(self.date))
    }

    pub fn row_channel(&self, row: &Row) -> Option<Channel> {
        normalize_channel(&row.text(self.channel))
    }
}

// ---------------------------------------------------------------------------
// Channel reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub channel: Channel,
    pub lead_count: usize,
    pub ad_cost: f64,
    pub contract_count: u32,
    pub contract_rate: f64,
    pub cost_per_lead: f64,
    pub cost_per_contract: f64,
    pub avg_cost_per_day: f64,
    /// Distinct months with cost records; all-time reports only.
    pub month_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallReport {
    pub scope: Scope,
    pub channels: Vec<ChannelReport>,
    pub total_leads: usize,
    pub total_cost: f64,
    pub total_contracts: u32,
    pub contract_rate: f64,
    pub cost_per_lead: f64,
    pub cost_per_contract: f64,
    /// Rows in scope whose channel answer matched nothing.
    pub unattributed: usize,
    /// Earliest and latest date in the data; all-time reports only.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

struct LeadTally {
    per_channel: [usize; Channel::ALL.len()],
    unattributed: usize,
}

fn tally_leads(dataset: &Dataset, columns: &ReportColumns, scope: Scope) -> LeadTally {
    let mut tally = LeadTally {
        per_channel: [0; Channel::ALL.len()],
        unattributed: 0,
    };
    for row in &dataset.rows {
        if !scope.includes(columns.row_date(row)) {
            continue;
        }
        match columns.row_channel(row) {
            Some(channel) => tally.per_channel[channel.index()] += 1,
            None => tally.unattributed += 1,
        }
    }
    tally
}

pub fn count_leads(
    dataset: &Dataset,
    columns: &ReportColumns,
    channel: Channel,
    scope: Scope,
) -> usize {
    tally_leads(dataset, columns, scope).per_channel[channel.index()]
}

fn build_channel_report(
    channel: Channel,
    lead_count: usize,
    costs: &[DailyAdCost],
    scope: Scope,
) -> ChannelReport {
    let records: Vec<&DailyAdCost> = costs
        .iter()
        .filter(|c| c.channel == channel && scope.includes(Some(c.date)))
        .collect();

    let ad_cost: f64 = records.iter().map(|c| c.cost).sum();
    let contract_count: u32 = records.iter().map(|c| c.contract_count).sum();
    let days: BTreeSet<NaiveDate> = records.iter().map(|c| c.date).collect();
    let month_count = match scope {
        Scope::AllTime => Some(
            records
                .iter()
                .map(|c| YearMonth::of(c.date))
                .collect::<BTreeSet<_>>()
                .len(),
        ),
        _ => None,
    };

    let leads = lead_count as f64;
    ChannelReport {
        channel,
        lead_count,
        ad_cost,
        contract_count,
        contract_rate: ratio(contract_count as f64, leads) * 100.0,
        cost_per_lead: ratio(ad_cost, leads),
        cost_per_contract: ratio(ad_cost, contract_count as f64),
        avg_cost_per_day: ratio(ad_cost, days.len() as f64),
        month_count,
    }
}

pub fn channel_report(
    dataset: &Dataset,
    columns: &ReportColumns,
    costs: &[DailyAdCost],
    channel: Channel,
    scope: Scope,
) -> ChannelReport {
    let leads = count_leads(dataset, columns, channel, scope);
    build_channel_report(channel, leads, costs, scope)
}

/// Every channel in canonical order plus totals derived from them.
pub fn overall_report(
    dataset: &Dataset,
    columns: &ReportColumns,
    costs: &[DailyAdCost],
    scope: Scope,
) -> OverallReport {
    let tally = tally_leads(dataset, columns, scope);
    let channels: Vec<ChannelReport> = Channel::ALL
        .iter()
        .map(|c| build_channel_report(*c, tally.per_channel[c.index()], costs, scope))
        .collect();

    let total_leads: usize = channels.iter().map(|r| r.lead_count).sum();
    let total_cost: f64 = channels.iter().map(|r| r.ad_cost).sum();
    let total_contracts: u32 = channels.iter().map(|r| r.contract_count).sum();

    let date_range = match scope {
        Scope::AllTime => {
            let dates: BTreeSet<NaiveDate> =
                dataset.rows.iter().filter_map(|r| columns.row_date(r)).collect();
            dates.first().copied().zip(dates.last().copied())
        }
        _ => None,
    };

    tracing::debug!(
        scope = %scope.label(),
        leads = total_leads,
        unattributed = tally.unattributed,
        "overall report"
    );

    OverallReport {
        scope,
        total_leads,
        total_cost,
        total_contracts,
        contract_rate: ratio(total_contracts as f64, total_leads as f64) * 100.0,
        cost_per_lead: ratio(total_cost, total_leads as f64),
        cost_per_contract: ratio(total_cost, total_contracts as f64),
        unattributed: tally.unattributed,
        date_range,
        channels,
    }
}

// ---------------------------------------------------------------------------
// Daily input sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DailyChannelRow {
    pub date: NaiveDate,
    pub lead_count: usize,
    pub cost: f64,
    pub contract_count: u32,
    pub note: Option<String>,
}

/// One row per calendar day of `month` for `channel`.
pub fn daily_rows(
    dataset: &Dataset,
    columns: &ReportColumns,
    costs: &[DailyAdCost],
    month: YearMonth,
    channel: Channel,
) -> Vec<DailyChannelRow> {
    let mut leads_by_day = vec![0usize; 31];
    for row in &dataset.rows {
        let Some(date) = columns.row_date(row) else {
            continue;
        };
        if month.contains(date) && columns.row_channel(row) == Some(channel) {
            leads_by_day[date.day0() as usize] += 1;
        }
    }

    month
        .days()
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let records: Vec<&DailyAdCost> = costs
                .iter()
                .filter(|c| c.channel == channel && c.date == date)
                .collect();
            DailyChannelRow {
                date,
                lead_count: leads_by_day[i],
                cost: records.iter().map(|c| c.cost).sum(),
                contract_count: records.iter().map(|c| c.contract_count).sum(),
                note: records.iter().find_map(|c| c.note.clone()),
            }
        })
        .collect()
}
