//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `import` - CSV import with header-driven column detection
//! - `report` - Spending report rendering
//! - `categories` - Category tree management
//! - `rules` - Classification rule management
//! - `serve` - Web server command
//! - `status` - Database status

pub mod categories;
pub mod import;
pub mod report;
pub mod rules;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use categories::*;
pub use import::*;
pub use report::*;
pub use rules::*;
pub use serve::*;
pub use status::*;

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::Database;

/// Open the database, creating it on first use
pub fn open_db(path: &Path) -> Result<Database> {
    Database::new(&path.to_string_lossy())
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
