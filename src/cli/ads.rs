use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{date_column, open_store};
use crate::dates;
use crate::error::{LeadError, Result};
use crate::fmt::yen;
use crate::models::{new_record_id, AdCost};
use crate::performance;
use crate::settings::load_settings;
use crate::storage;

pub fn add(start: &str, end: &str, cost: f64, description: Option<String>) -> Result<()> {
    let start_date = dates::parse_iso_date(start)?;
    let end_date = dates::parse_iso_date(end)?;
    if end_date < start_date {
        return Err(LeadError::Other(format!("End date {end} is before start date {start}")));
    }
    if cost < 0.0 {
        return Err(LeadError::Other("Cost cannot be negative".to_string()));
    }

    let store = open_store(&load_settings())?;
    let record = AdCost {
        id: new_record_id(),
        start_date,
        end_date,
        cost,
        description: description.filter(|d| !d.trim().is_empty()),
    };
    let id = record.id.clone();
    storage::add_ad_cost(&store, record)?;
    println!("Added campaign {id}: {start_date} .. {end_date} {}", yen(cost));
    Ok(())
}

pub fn list() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let costs = storage::load_ad_costs(&store);
    if costs.is_empty() {
        println!("No campaigns recorded.");
        return Ok(());
    }

    // Performance columns need a dataset with a date column; without one just list.
    let dated = storage::load_dataset(&store).and_then(|ds| {
        let col = date_column(&ds, &settings).ok()?;
        Some((ds, col))
    });

    let mut table = Table::new();
    table.set_header(vec!["ID", "Period", "Cost", "Responses", "Cost/response", "Description"]);
    for cost in &costs {
        let (period, responses, per_response) = match &dated {
            Some((ds, col)) => {
                let perf = performance::ad_performance(ds, *col, cost);
                (
                    perf.period,
                    perf.responses.to_string(),
                    yen(perf.cost_per_response),
                )
            }
            None => (
                format!("{} .. {}", cost.start_date, cost.end_date),
                "-".to_string(),
                "-".to_string(),
            ),
        };
        table.add_row(vec![
            Cell::new(&cost.id),
            Cell::new(period),
            Cell::new(yen(cost.cost)),
            Cell::new(responses),
            Cell::new(per_response),
            Cell::new(cost.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("Campaigns\n{table}");
    Ok(())
}

pub fn remove(id: &str) -> Result<()> {
    let store = open_store(&load_settings())?;
    if storage::remove_ad_cost(&store, id)? {
        println!("Removed campaign {id}");
        Ok(())
    } else {
        Err(LeadError::Other(format!("No campaign with ID {id}")))
    }
}

pub fn clear() -> Result<()> {
    let store = open_store(&load_settings())?;
    storage::clear_ad_costs(&store)?;
    println!("All campaigns removed.");
    Ok(())
}

pub fn total() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let costs = storage::load_ad_costs(&store);
    let dataset = crate::cli::require_dataset(&store)?;
    let col = date_column(&dataset, &settings)?;

    let Some(perf) = performance::total_ad_performance(&dataset, col, &costs) else {
        println!("No campaigns recorded.");
        return Ok(());
    };

    println!("{}", "All campaigns".bold());
    println!("Period:          {}", perf.period);
    println!("Total cost:      {}", yen(perf.total_cost));
    println!("Responses:       {}", perf.responses);
    println!("Cost/response:   {}", yen(perf.cost_per_response));

    if !perf.daily.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Responses"]);
        for (date, count) in &perf.daily {
            table.add_row(vec![Cell::new(date), Cell::new(count)]);
        }
        println!("\n{table}");
    }
    Ok(())
}
