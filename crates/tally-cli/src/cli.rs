//! CLI argument definitions using clap
//!
//! Clap structs and enums only; the command implementations live in the
//! `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Track and classify financial transactions
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted transaction tracker with rule-based classification", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import transactions from a CSV export
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Source (account) name the transactions belong to
        #[arg(short, long)]
        source: String,

        /// Skip rule classification after import
        #[arg(long)]
        no_classify: bool,

        /// Override the detected date column (zero-based index)
        #[arg(long)]
        date_col: Option<usize>,

        /// Override the detected description column
        #[arg(long)]
        description_col: Option<usize>,

        /// Override the detected amount column
        #[arg(long)]
        amount_col: Option<usize>,

        /// Override the detected bank-category column
        #[arg(long)]
        category_col: Option<usize>,
    },

    /// Category spending report with budget rollup
    Report {
        /// Period: current_month, last_month, last_3_months, last_6_months,
        /// year_to_date, custom
        #[arg(short, long, default_value = "current_month")]
        period: String,

        /// Custom range start (YYYY-MM-DD, with --period custom)
        #[arg(long)]
        from: Option<String>,

        /// Custom range end (YYYY-MM-DD, with --period custom)
        #[arg(long)]
        to: Option<String>,

        /// Filter to one unit id
        #[arg(short, long)]
        unit: Option<i64>,

        /// Show only the top N categories by spend
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },

    /// Manage classification rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Show database status
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List the category tree
    List,

    /// Add a category
    Add {
        name: String,

        /// Parent category id
        #[arg(long)]
        parent: Option<i64>,

        /// Monthly budget
        #[arg(long)]
        budget: Option<f64>,

        /// Display color (hex)
        #[arg(long)]
        color: Option<String>,
    },

    /// Move a category under a new parent (cycle-guarded)
    Move {
        id: i64,

        /// New parent id; omit to make it a root
        #[arg(long)]
        parent: Option<i64>,
    },

    /// Set or clear a category's monthly budget
    Budget {
        id: i64,

        /// New budget; omit to clear
        #[arg(long)]
        amount: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules of one kind in evaluation order
    List {
        /// unit or category
        kind: String,
    },

    /// Add a rule
    Add {
        /// unit or category
        kind: String,

        /// Pattern to match
        pattern: String,

        /// Target unit/category id
        #[arg(long)]
        target: i64,

        /// Field: description, source, or source_category
        #[arg(long, default_value = "description")]
        field: String,

        /// Match mode: exact, contains, starts_with, regex
        #[arg(long, default_value = "contains")]
        mode: String,
    },

    /// Reorder rules: ids from highest to lowest priority
    Reorder {
        /// unit or category
        kind: String,

        /// Rule ids in the new order
        ids: Vec<i64>,
    },
}
