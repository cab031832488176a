use std::path::Path;

use colored::Colorize;

use crate::cli::open_store;
use crate::error::{LeadError, Result};
use crate::filter;
use crate::importer::{self, LoadResult};
use crate::settings::load_settings;
use crate::sheets::{self, CancelToken};
use crate::storage::{self, KeyValueStore};

pub fn load(file: &str) -> Result<()> {
    let settings = load_settings();
    let path = Path::new(file);
    if !path.exists() {
        return Err(LeadError::Other(format!("File not found: {file}")));
    }
    let result = importer::load_file(path)?;
    let store = open_store(&settings)?;

    let unchanged = storage::load_dataset(&store)
        .and_then(|stored| stored.checksum)
        .is_some_and(|sum| Some(&sum) == result.dataset.checksum.as_ref());
    if unchanged {
        println!("{} is already the stored dataset.", result.dataset.source);
        return Ok(());
    }

    store_result(&store, result)
}

pub fn fetch(spreadsheet_id: Option<String>) -> Result<()> {
    let settings = load_settings();
    let id = spreadsheet_id.unwrap_or(settings.spreadsheet_id.clone());
    let result = sheets::fetch_sheet(&id, &CancelToken::new())?;
    let store = open_store(&settings)?;
    store_result(&store, result)
}

fn store_result(store: &dyn KeyValueStore, result: LoadResult) -> Result<()> {
    let LoadResult { dataset, warnings } = result;
    for warning in &warnings {
        eprintln!("{} {warning}", "warning:".yellow());
    }

    match storage::save_dataset(store, &dataset) {
        Ok(_) => {}
        Err(LeadError::SnapshotTooLarge { size, limit }) => {
            eprintln!(
                "{} dataset is {size} bytes, over the {limit} byte storage limit; it was not saved",
                "warning:".yellow()
            );
        }
        Err(e) => return Err(e),
    }

    println!(
        "{} {} ({} rows, {} columns)",
        "Loaded".green().bold(),
        dataset.source,
        dataset.rows.len(),
        dataset.headers.len()
    );
    match filter::detect_date_column(&dataset) {
        Some(col) => println!("Date column: {}", dataset.headers[col]),
        None => println!("Date column: (not detected)"),
    }
    if !warnings.is_empty() {
        println!("{} rows had warnings", warnings.len());
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    if !storage::storage_info(&store).exists {
        println!("No stored dataset.");
        return Ok(());
    }
    storage::clear_dataset(&store)?;
    println!("Stored dataset removed.");
    Ok(())
}
