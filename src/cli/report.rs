use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::channel::Channel;
use crate::cli::{date_column, open_store, report_columns, require_dataset};
use crate::dates::{self, YearMonth};
use crate::detailed;
use crate::error::Result;
use crate::fmt::{percent, thousands, yen, yen_rounded};
use crate::models::Dataset;
use crate::rent::{self, RentAnalysis};
use crate::reports::{self, ChannelReport, OverallReport, ReportColumns, Scope};
use crate::responses;
use crate::settings::{load_settings, Settings};
use crate::storage;

struct Context {
    settings: Settings,
    dataset: Dataset,
    columns: ReportColumns,
    store: storage::SqliteStore,
}

fn context() -> Result<Context> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let dataset = require_dataset(&store)?;
    let columns = report_columns(&dataset, &settings)?;
    Ok(Context {
        settings,
        dataset,
        columns,
        store,
    })
}

fn channel_row(r: &ChannelReport, with_months: bool) -> Vec<Cell> {
    let mut row = vec![
        Cell::new(r.channel.label()),
        Cell::new(r.lead_count),
        Cell::new(yen(r.ad_cost)),
        Cell::new(r.contract_count),
        Cell::new(percent(r.contract_rate)),
        Cell::new(yen(r.cost_per_lead)),
        Cell::new(yen(r.cost_per_contract)),
        Cell::new(yen(r.avg_cost_per_day)),
    ];
    if with_months {
        row.push(Cell::new(r.month_count.unwrap_or(0)));
    }
    row
}

fn overall_table(report: &OverallReport, with_months: bool) -> Table {
    let mut header = vec![
        "Channel",
        "Leads",
        "Ad cost",
        "Contracts",
        "Contract rate",
        "Cost/lead",
        "Cost/contract",
        "Cost/day",
    ];
    if with_months {
        header.push("Months");
    }

    let mut table = Table::new();
    table.set_header(header);
    for r in &report.channels {
        table.add_row(channel_row(r, with_months));
    }
    let mut total = vec![
        Cell::new("Total".bold()),
        Cell::new(report.total_leads),
        Cell::new(yen(report.total_cost)),
        Cell::new(report.total_contracts),
        Cell::new(percent(report.contract_rate)),
        Cell::new(yen(report.cost_per_lead)),
        Cell::new(yen(report.cost_per_contract)),
        Cell::new(""),
    ];
    if with_months {
        total.push(Cell::new(""));
    }
    table.add_row(total);
    table
}

fn print_unattributed(report: &OverallReport) {
    if report.unattributed > 0 {
        println!(
            "{} responses did not name a known channel",
            report.unattributed.to_string().yellow()
        );
    }
}

pub fn monthly(month: &str) -> Result<()> {
    let month: YearMonth = month.parse()?;
    let ctx = context()?;
    let costs = storage::daily_costs_for(&ctx.store, Some(month), None);
    let report = reports::overall_report(&ctx.dataset, &ctx.columns, &costs, Scope::Month(month));

    println!("{}\n{}", format!("Channel report {month}").bold(), overall_table(&report, false));
    print_unattributed(&report);
    Ok(())
}

pub fn all_time() -> Result<()> {
    let ctx = context()?;
    let costs = storage::load_daily_costs(&ctx.store);
    let report = reports::overall_report(&ctx.dataset, &ctx.columns, &costs, Scope::AllTime);

    println!("{}", "Channel report (all time)".bold());
    if let Some((first, last)) = report.date_range {
        println!("Period: {first} .. {last}");
    }
    println!("{}", overall_table(&report, true));
    print_unattributed(&report);
    Ok(())
}

pub fn daily(month: &str, channel: &str) -> Result<()> {
    let month: YearMonth = month.parse()?;
    let channel: Channel = channel.parse()?;
    let ctx = context()?;
    let costs = storage::daily_costs_for(&ctx.store, Some(month), Some(channel));
    let rows = reports::daily_rows(&ctx.dataset, &ctx.columns, &costs, month, channel);

    let mut table = Table::new();
    table.set_header(vec!["Date", "Leads", "Ad cost", "Contracts", "Note"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.date.format("%m/%d")),
            Cell::new(row.lead_count),
            Cell::new(if row.cost > 0.0 { yen(row.cost) } else { String::new() }),
            Cell::new(if row.contract_count > 0 {
                row.contract_count.to_string()
            } else {
                String::new()
            }),
            Cell::new(row.note.as_deref().unwrap_or("")),
        ]);
    }
    let leads: usize = rows.iter().map(|r| r.lead_count).sum();
    let cost: f64 = rows.iter().map(|r| r.cost).sum();
    let contracts: u32 = rows.iter().map(|r| r.contract_count).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(leads),
        Cell::new(yen(cost)),
        Cell::new(contracts),
        Cell::new(""),
    ]);

    println!("{}\n{table}", format!("{channel} {month}").bold());
    Ok(())
}

fn scope_from_flags(month: Option<&str>, day: Option<&str>) -> Result<Scope> {
    if let Some(day) = day {
        return Ok(Scope::Day(dates::parse_iso_date(day)?));
    }
    match month {
        Some(m) => Ok(Scope::Month(m.parse()?)),
        None => Ok(Scope::AllTime),
    }
}

fn print_rent(analysis: &RentAnalysis) {
    let s = &analysis.stats;
    println!(
        "Valid answers: {} / invalid: {}",
        analysis.valid_count, analysis.invalid_count
    );
    if s.count == 0 {
        println!("No usable rent answers.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Average", "Median", "Min", "Max"]);
    table.add_row(vec![
        Cell::new(yen_rounded(s.average)),
        Cell::new(yen(s.median as f64)),
        Cell::new(yen(s.min as f64)),
        Cell::new(yen(s.max as f64)),
    ]);
    println!("{table}");

    if !analysis.distribution.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Band", "Count", "%"]);
        for (band, count) in &analysis.distribution {
            table.add_row(vec![
                Cell::new(band),
                Cell::new(count),
                Cell::new(percent(*count as f64 / s.count as f64 * 100.0)),
            ]);
        }
        println!("{table}");
    }
}

pub fn detailed(channel: &str, month: Option<String>, day: Option<String>) -> Result<()> {
    let channel: Channel = channel.parse()?;
    let scope = scope_from_flags(month.as_deref(), day.as_deref())?;
    let ctx = context()?;
    let analysis = detailed::detailed_analysis(
        &ctx.dataset,
        &ctx.columns,
        ctx.settings.rent_strategy,
        channel,
        scope,
    );

    println!("{}", format!("{channel} ({})", scope.label()).bold());
    println!("Leads: {}", analysis.total_leads);
    if analysis.total_leads == 0 {
        return Ok(());
    }
    println!("Peak hour: {:02}:00", analysis.peak_hour);

    let mut table = Table::new();
    table.set_header(vec!["Hour", "Leads"]);
    for (hour, count) in analysis.hours.iter().enumerate().filter(|(_, c)| **c > 0) {
        table.add_row(vec![Cell::new(format!("{hour:02}:00")), Cell::new(count)]);
    }
    println!("\n{}\n{table}", "By hour".bold());

    let mut table = Table::new();
    table.set_header(vec!["Pets", "Leads", "%"]);
    for share in &analysis.pet_types {
        table.add_row(vec![
            Cell::new(&share.pet_type),
            Cell::new(share.count),
            Cell::new(percent(share.percentage)),
        ]);
    }
    println!("\n{}\n{table}", "Pet answers".bold());
    let pets = &analysis.pets;
    println!(
        "Dogs: {}  Cats: {}  Both: {}  Unknown: {}",
        pets.dogs, pets.cats, pets.both, pets.unknown
    );

    if let Some(rent) = &analysis.rent {
        println!("\n{}", "Desired rent".bold());
        print_rent(rent);
    }
    Ok(())
}

pub fn rent(channel: Option<String>, month: Option<String>) -> Result<()> {
    let channel = channel.as_deref().map(str::parse::<Channel>).transpose()?;
    let scope = scope_from_flags(month.as_deref(), None)?;
    let ctx = context()?;

    let Some(analysis) = rent::analyze_rent(
        &ctx.dataset,
        &ctx.columns,
        ctx.settings.rent_strategy,
        channel,
        scope,
    ) else {
        println!("No rent column in the dataset.");
        return Ok(());
    };

    let who = channel.map_or("All channels".to_string(), |c| c.label().to_string());
    println!(
        "{}",
        format!("Desired rent: {who} ({}, {})", scope.label(), ctx.settings.rent_strategy).bold()
    );
    print_rent(&analysis);
    Ok(())
}

pub fn rent_overview() -> Result<()> {
    let ctx = context()?;
    let Some(overview) =
        rent::rent_overview(&ctx.dataset, &ctx.columns, ctx.settings.rent_strategy)
    else {
        println!("No rent column in the dataset.");
        return Ok(());
    };

    println!("{}", "Desired rent by month and channel".bold());
    if let Some((first, last)) = overview.period {
        println!("Period: {first} .. {last}");
    }
    println!(
        "Responses: {}  Average: {}  Median: {}",
        thousands(overview.total_responses as u64),
        yen_rounded(overview.overall_average),
        yen(overview.overall_median as f64)
    );

    let mut table = Table::new();
    table.set_header(vec!["Month", "Channel", "Answers", "Average", "Median", "Min", "Max"]);
    for entry in &overview.entries {
        table.add_row(vec![
            Cell::new(entry.month),
            Cell::new(entry.channel.label()),
            Cell::new(entry.stats.count),
            Cell::new(yen_rounded(entry.stats.average)),
            Cell::new(yen(entry.stats.median as f64)),
            Cell::new(yen(entry.stats.min as f64)),
            Cell::new(yen(entry.stats.max as f64)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn responses() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let dataset = require_dataset(&store)?;
    let col = date_column(&dataset, &settings)?;
    let summary = responses::response_summary(&dataset, col);

    let mut table = Table::new();
    table.set_header(vec!["Month", "Responses", "Change", "Change %"]);
    for m in &summary.months {
        let change = m.change.map(|c| format!("{c:+}")).unwrap_or_default();
        let rate = m.change_rate.map(|r| format!("{r:+.1}%")).unwrap_or_default();
        let change = match m.change {
            Some(c) if c < 0 => change.red().to_string(),
            Some(c) if c > 0 => change.green().to_string(),
            _ => change,
        };
        table.add_row(vec![
            Cell::new(m.month),
            Cell::new(m.count),
            Cell::new(change),
            Cell::new(rate),
        ]);
    }
    println!("{}\n{table}", "Responses by month".bold());
    println!("Total: {}", summary.total);
    println!("Average per month: {:.1}", summary.average_per_month);
    if let Some((month, count)) = summary.peak {
        println!("Peak: {month} ({count})");
    }
    if let Some((month, count)) = summary.lowest {
        println!("Lowest: {month} ({count})");
    }
    Ok(())
}
