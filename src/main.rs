mod channel;
mod cli;
mod dates;
mod db;
mod detailed;
mod error;
mod filter;
mod fmt;
mod importer;
mod models;
mod performance;
mod rent;
mod reports;
mod responses;
mod settings;
mod sheets;
mod stats;
mod storage;
mod telemetry;

use clap::Parser;

use cli::{AdsCommands, Cli, Commands, ConfigCommands, CostsCommands, ReportCommands};

fn main() {
    let cli = Cli::parse();
    telemetry::init(&settings::load_settings().log_level);

    let result = match cli.command {
        Commands::Load { file } => cli::load::load(&file),
        Commands::Fetch { spreadsheet_id } => cli::load::fetch(spreadsheet_id),
        Commands::Status => cli::status::run(),
        Commands::Clear => cli::load::clear(),
        Commands::Months => cli::status::months(),
        Commands::Stats {
            column,
            top,
            normalize_rent,
            dates,
        } => cli::stats::run(column, top, normalize_rent, dates),
        Commands::Report { command } => match command {
            ReportCommands::Monthly { month } => cli::report::monthly(&month),
            ReportCommands::AllTime => cli::report::all_time(),
            ReportCommands::Daily { month, channel } => cli::report::daily(&month, &channel),
            ReportCommands::Detailed {
                channel,
                month,
                day,
            } => cli::report::detailed(&channel, month, day),
            ReportCommands::Rent { channel, month } => cli::report::rent(channel, month),
            ReportCommands::RentOverview => cli::report::rent_overview(),
            ReportCommands::Responses => cli::report::responses(),
        },
        Commands::Costs { command } => match command {
            CostsCommands::Set {
                date,
                channel,
                cost,
                contracts,
                note,
            } => cli::costs::set(&date, &channel, cost, contracts, note),
            CostsCommands::Save {
                month,
                channel,
                file,
            } => cli::costs::save(&month, &channel, &file),
            CostsCommands::List { month, channel } => cli::costs::list(month, channel),
            CostsCommands::Remove { id } => cli::costs::remove(&id),
        },
        Commands::Ads { command } => match command {
            AdsCommands::Add {
                start,
                end,
                cost,
                description,
            } => cli::ads::add(&start, &end, cost, description),
            AdsCommands::List => cli::ads::list(),
            AdsCommands::Remove { id } => cli::ads::remove(&id),
            AdsCommands::Clear => cli::ads::clear(),
            AdsCommands::Total => cli::ads::total(),
        },
        Commands::Config { command } => match command {
            None => cli::config::show(),
            Some(ConfigCommands::Set { key, value }) => cli::config::set(&key, &value),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
