use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{date_column, open_store, require_dataset, DateArgs};
use crate::error::Result;
use crate::filter::DateFilter;
use crate::fmt::thousands;
use crate::models::Dataset;
use crate::rent::normalize_rent_columns;
use crate::settings::load_settings;
use crate::stats::{self, StatsDetail, WEEKDAY_NAMES};

pub fn run(column: Option<String>, top: usize, normalize_rent: bool, dates: DateArgs) -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let mut dataset = require_dataset(&store)?;

    let filter = dates.filter()?;
    if filter != DateFilter::All {
        let col = date_column(&dataset, &settings)?;
        dataset = filter.apply(&dataset, col);
        println!("Period: {} ({} rows)", filter.label(), dataset.rows.len());
    }
    if normalize_rent {
        dataset = normalize_rent_columns(&dataset, settings.rent_strategy);
    }

    match column {
        Some(name) => column_detail(&dataset, &name, top),
        None => overview(&dataset),
    }
}

fn overview(dataset: &Dataset) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Column", "Type", "Values", "Unique", "Empty"]);
    for header in &dataset.headers {
        let s = stats::calculate_column_stats(dataset, header)?;
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(s.data_type),
            Cell::new(s.total_count - s.null_count),
            Cell::new(s.unique_count),
            Cell::new(s.null_count),
        ]);
    }
    println!("{}\n{table}", "Columns".bold());
    Ok(())
}

fn column_detail(dataset: &Dataset, column: &str, top: usize) -> Result<()> {
    let s = stats::calculate_column_stats(dataset, column)?;

    println!("{}", s.name.bold());
    println!("Type:    {}", s.data_type);
    println!("Rows:    {}", s.total_count);
    println!("Unique:  {}", s.unique_count);
    println!("Empty:   {}", s.null_count);

    match &s.detail {
        StatsDetail::Numeric {
            min,
            max,
            mean,
            median,
            sum,
        } => {
            let mut table = Table::new();
            table.set_header(vec!["Min", "Max", "Mean", "Median", "Sum"]);
            table.add_row(vec![
                Cell::new(min),
                Cell::new(max),
                Cell::new(format!("{mean:.2}")),
                Cell::new(median),
                Cell::new(sum),
            ]);
            println!("\n{table}");
        }
        StatsDetail::Text {
            max_length,
            min_length,
            avg_length,
            ..
        } => {
            println!("Length:  {min_length}..{max_length} (avg {avg_length:.1})");
        }
        StatsDetail::Date {
            hours,
            weekdays,
            min,
            max,
        } => {
            println!("Range:   {} .. {}", min.format("%Y-%m-%d %H:%M"), max.format("%Y-%m-%d %H:%M"));

            let mut table = Table::new();
            table.set_header(vec!["Weekday", "Count"]);
            for (name, count) in WEEKDAY_NAMES.iter().zip(weekdays) {
                table.add_row(vec![Cell::new(name), Cell::new(count)]);
            }
            println!("\n{}\n{table}", "By weekday".bold());

            let mut table = Table::new();
            table.set_header(vec!["Hour", "Count"]);
            for (hour, count) in hours.iter().enumerate().filter(|(_, c)| **c > 0) {
                table.add_row(vec![Cell::new(format!("{hour:02}:00")), Cell::new(count)]);
            }
            println!("\n{}\n{table}", "By hour".bold());
        }
        StatsDetail::None => {}
    }

    if top > 0 && !matches!(s.detail, StatsDetail::Date { .. }) {
        let values = stats::value_frequencies(dataset, column, top)?;
        if !values.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Value", "Count", "%"]);
            for v in &values {
                table.add_row(vec![
                    Cell::new(&v.value),
                    Cell::new(thousands(v.count as u64)),
                    Cell::new(format!("{:.2}%", v.percentage)),
                ]);
            }
            println!("\n{}\n{table}", format!("Top {top}").bold());
        }
    }
    Ok(())
}
