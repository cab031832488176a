use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Deserialize;

use crate::channel::Channel;
use crate::cli::open_store;
use crate::dates::{self, YearMonth};
use crate::error::{LeadError, Result};
use crate::fmt::yen;
use crate::models::{new_record_id, DailyAdCost};
use crate::settings::load_settings;
use crate::storage;

pub fn set(
    date: &str,
    channel: &str,
    cost: f64,
    contracts: u32,
    note: Option<String>,
) -> Result<()> {
    let date = dates::parse_iso_date(date)?;
    let channel: Channel = channel.parse()?;
    check_cost(cost)?;
    let month = YearMonth::of(date);
    let store = open_store(&load_settings())?;

    let mut entries = storage::daily_costs_for(&store, Some(month), Some(channel));
    entries.retain(|e| e.date != date);
    entries.push(DailyAdCost {
        id: new_record_id(),
        date,
        channel,
        cost,
        contract_count: contracts,
        note: note.filter(|n| !n.trim().is_empty()),
    });
    storage::replace_month_costs(&store, month, channel, entries)?;

    if cost == 0.0 && contracts == 0 {
        println!("Cleared {channel} on {date}");
    } else {
        println!("Saved {channel} on {date}: {} / {contracts} contracts", yen(cost));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DailyInput {
    date: String,
    cost: Option<f64>,
    contracts: Option<u32>,
    note: Option<String>,
}

fn check_cost(cost: f64) -> Result<()> {
    if cost < 0.0 {
        return Err(LeadError::Other("Cost cannot be negative".to_string()));
    }
    Ok(())
}

fn read_month_file(path: &Path, month: YearMonth, channel: Channel) -> Result<Vec<DailyAdCost>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut entries = Vec::new();
    for record in rdr.deserialize() {
        let input: DailyInput = record?;
        let date = dates::parse_date(&input.date)
            .ok_or_else(|| LeadError::InvalidDate(input.date.clone()))?;
        if !month.contains(date) {
            tracing::warn!(%date, %month, "cost row outside month ignored");
            continue;
        }
        let cost = input.cost.unwrap_or(0.0);
        check_cost(cost)?;
        entries.push(DailyAdCost {
            id: new_record_id(),
            date,
            channel,
            cost,
            contract_count: input.contracts.unwrap_or(0),
            note: input.note.filter(|n| !n.is_empty()),
        });
    }
    Ok(entries)
}

pub fn save(month: &str, channel: &str, file: &str) -> Result<()> {
    let month: YearMonth = month.parse()?;
    let channel: Channel = channel.parse()?;
    let entries = read_month_file(Path::new(file), month, channel)?;
    let store = open_store(&load_settings())?;
    let kept = storage::replace_month_costs(&store, month, channel, entries)?;
    println!("Saved {kept} days for {channel} in {month}");
    Ok(())
}

pub fn list(month: Option<String>, channel: Option<String>) -> Result<()> {
    let month = month.as_deref().map(str::parse::<YearMonth>).transpose()?;
    let channel = channel.as_deref().map(str::parse::<Channel>).transpose()?;
    let store = open_store(&load_settings())?;
    let costs = storage::daily_costs_for(&store, month, channel);

    if costs.is_empty() {
        println!("No cost records.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Channel", "Cost", "Contracts", "Note"]);
    for c in &costs {
        table.add_row(vec![
            Cell::new(&c.id),
            Cell::new(c.date),
            Cell::new(c.channel.label()),
            Cell::new(yen(c.cost)),
            Cell::new(c.contract_count),
            Cell::new(c.note.as_deref().unwrap_or("")),
        ]);
    }
    let total: f64 = costs.iter().map(|c| c.cost).sum();
    let contracts: u32 = costs.iter().map(|c| c.contract_count).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(yen(total)),
        Cell::new(contracts),
        Cell::new(""),
    ]);
    println!("Cost records\n{table}");
    Ok(())
}

pub fn remove(id: &str) -> Result<()> {
    let store = open_store(&load_settings())?;
    if storage::remove_daily_cost(&store, id)? {
        println!("Removed cost record {id}");
        Ok(())
    } else {
        Err(LeadError::Other(format!("No cost record with ID {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_month_file_rejects_negative_cost() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "date,cost,contracts,note").unwrap();
        writeln!(f, "2024-11-01,5000,,").unwrap();
        writeln!(f, "2024-11-02,-300,,refund").unwrap();
        let month: YearMonth = "2024-11".parse().unwrap();
        let err = read_month_file(f.path(), month, Channel::TikTok).unwrap_err();
        assert!(err.to_string().contains("Cost cannot be negative"));
        assert!(check_cost(0.0).is_ok());
    }

    #[test]
    fn test_read_month_file_drops_other_months() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "date,cost,contracts,note").unwrap();
        writeln!(f, "2024-11-01,5000,,").unwrap();
        writeln!(f, "2024/11/02,,1,signed").unwrap();
        writeln!(f, "2024-12-01,9000,0,").unwrap();
        let month: YearMonth = "2024-11".parse().unwrap();
        let entries = read_month_file(f.path(), month, Channel::Instagram).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].cost, 5000.0);
        assert_eq!(entries[1].contract_count, 1);
        assert_eq!(entries[1].note.as_deref(), Some("signed"));
    }

    #[test]
    fn test_read_month_file_rejects_bad_date() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "date,cost,contracts,note").unwrap();
        writeln!(f, "someday,5000,,").unwrap();
        let month: YearMonth = "2024-11".parse().unwrap();
        assert!(matches!(
            read_month_file(f.path(), month, Channel::Line),
            Err(LeadError::InvalidDate(_))
        ));
    }
}
