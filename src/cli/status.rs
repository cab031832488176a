use crate::cli::{date_column, open_store};
use crate::error::Result;
use crate::filter;
use crate::fmt::format_bytes;
use crate::settings::{load_settings, settings_path};
use crate::storage;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;

    println!("Settings:   {}", settings_path().display());
    println!("Data dir:   {}", settings.data_dir);
    println!("Rent:       {}", settings.rent_strategy);

    let info = storage::storage_info(&store);
    let Some(dataset) = storage::load_dataset(&store).filter(|_| info.exists) else {
        println!();
        println!("No dataset stored. Run `leadstats load <file>` or `leadstats fetch`.");
        return Ok(());
    };

    println!();
    println!("Source:     {}", dataset.source);
    println!("Rows:       {}", dataset.rows.len());
    println!("Columns:    {}", dataset.headers.len());
    println!("Size:       {}", format_bytes(info.size as u64));
    if let Some(saved) = info.saved_at {
        println!("Saved:      {}", saved.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(sum) = &dataset.checksum {
        println!("Checksum:   {}", &sum[..sum.len().min(12)]);
    }

    match date_column(&dataset, &settings) {
        Ok(col) => {
            println!("Date col:   {}", dataset.headers[col]);
            if let Some((first, last)) = filter::date_range(&dataset, col) {
                println!("Period:     {} .. {}", first.date(), last.date());
            }
        }
        Err(e) => println!("Date col:   ({e})"),
    }
    Ok(())
}

pub fn months() -> Result<()> {
    let settings = load_settings();
    let store = open_store(&settings)?;
    let dataset = crate::cli::require_dataset(&store)?;
    let col = date_column(&dataset, &settings)?;

    let months = filter::available_months(&dataset, col);
    if months.is_empty() {
        println!("No dated rows.");
        return Ok(());
    }
    for month in months {
        println!("{month}");
    }
    Ok(())
}
