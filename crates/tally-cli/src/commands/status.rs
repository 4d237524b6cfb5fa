//! Status command

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path) -> Result<()> {
    println!();
    println!("📊 Tally Status");
    println!("   ─────────────────────────────────────────");
    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = std::fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
        return Ok(());
    }

    let db = open_db(db_path)?;
    println!();
    println!("   Sources: {}", db.list_sources()?.len());
    println!("   Units: {}", db.list_units(true)?.len());
    println!("   Categories: {}", db.get_categories_flat()?.len());
    println!("   Transactions: {}", db.count_transactions()?);
    println!(
        "   Unclassified: {}",
        db.unclassified_transactions(i64::MAX)?.len()
    );

    Ok(())
}
