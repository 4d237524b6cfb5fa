//! Tally CLI - Transaction tracker
//!
//! Usage:
//!   tally import --file CSV --source Checking   Import a bank export
//!   tally report --period last_month            Category spending report
//!   tally serve --port 3000                     Start the web server

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Import {
            file,
            source,
            no_classify,
            date_col,
            description_col,
            amount_col,
            category_col,
        } => commands::cmd_import(
            &cli.db,
            &file,
            &source,
            no_classify,
            commands::ColumnOverrides {
                date: date_col,
                description: description_col,
                amount: amount_col,
                source_category: category_col,
            },
        ),
        Commands::Report { period, from, to, unit, limit } => {
            commands::cmd_report(&cli.db, &period, from.as_deref(), to.as_deref(), unit, limit)
        }
        Commands::Categories { action } => commands::cmd_categories(&cli.db, action),
        Commands::Rules { action } => commands::cmd_rules(&cli.db, action),
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port).await,
    }
}
