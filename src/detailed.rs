use chrono::Timelike;

use crate::channel::Channel;
use crate::dates;
use crate::models::{Dataset, Row};
use crate::rent::{analyze_rent, RentAnalysis, RentStrategy};
use crate::reports::{ReportColumns, Scope};

pub const UNKNOWN_PET: &str = "(不明)";

#[derive(Debug, Clone, PartialEq)]
pub struct PetTypeShare {
    pub pet_type: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PetCategories {
    pub dogs: usize,
    pub cats: usize,
    pub both: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedAnalysis {
    pub channel: Channel,
    pub scope: Scope,
    pub total_leads: usize,
    pub hours: [usize; 24],
    pub peak_hour: usize,
    pub pet_types: Vec<PetTypeShare>,
    pub pets: PetCategories,
    pub rent: Option<RentAnalysis>,
}

fn hour_distribution(rows: &[&Row], columns: &ReportColumns) -> [usize; 24] {
    let mut hours = [0usize; 24];
    for row in rows {
        // Date-only values carry no hour.
        if let Some(stamp) = dates::parse_datetime(&row.text(columns.date)) {
            hours[stamp.hour() as usize] += 1;
        }
    }
    hours
}

/// First hour with the highest count; 0 when nothing was counted.
fn peak_hour(hours: &[usize; 24]) -> usize {
    let mut peak = 0;
    for (hour, count) in hours.iter().enumerate() {
        if *count > hours[peak] {
            peak = hour;
        }
    }
    peak
}

fn pet_text(row: &Row, columns: &ReportColumns) -> String {
    columns
        .pet
        .map(|i| row.text(i).trim().to_string())
        .unwrap_or_default()
}

fn pet_type_shares(rows: &[&Row], columns: &ReportColumns) -> Vec<PetTypeShare> {
    let mut shares: Vec<PetTypeShare> = Vec::new();
    for row in rows {
        let text = pet_text(row, columns);
        let pet_type = if text.is_empty() { UNKNOWN_PET.to_string() } else { text };
        match shares.iter_mut().find(|s| s.pet_type == pet_type) {
            Some(share) => share.count += 1,
            None => shares.push(PetTypeShare {
                pet_type,
                count: 1,
                percentage: 0.0,
            }),
        }
    }
    let total = rows.len();
    for share in &mut shares {
        share.percentage = share.count as f64 / total as f64 * 100.0;
    }
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

fn pet_categories(rows: &[&Row], columns: &ReportColumns) -> PetCategories {
    let mut pets = PetCategories::default();
    for row in rows {
        let text = pet_text(row, columns);
        match (text.contains('犬'), text.contains('猫')) {
            (true, true) => pets.both += 1,
            (true, false) => pets.dogs += 1,
            (false, true) => pets.cats += 1,
            (false, false) => pets.unknown += 1,
        }
    }
    pets
}

pub fn detailed_analysis(
    dataset: &Dataset,
    columns: &ReportColumns,
    strategy: RentStrategy,
    channel: Channel,
    scope: Scope,
) -> DetailedAnalysis {
    let rows: Vec<&Row> = dataset
        .rows
        .iter()
        .filter(|row| {
            scope.includes(columns.row_date(row)) && columns.row_channel(row) == Some(channel)
        })
        .collect();

    let hours = hour_distribution(&rows, columns);
    DetailedAnalysis {
        channel,
        scope,
        total_leads: rows.len(),
        peak_hour: peak_hour(&hours),
        hours,
        pet_types: pet_type_shares(&rows, columns),
        pets: pet_categories(&rows, columns),
        rent: analyze_rent(dataset, columns, strategy, Some(channel), scope),
    }
}
