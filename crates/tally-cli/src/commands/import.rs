//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;

use tally_core::classify::apply_rules;
use tally_core::columns::{classify_widths, map_columns, ColumnMap};
use tally_core::import::{import_records, records_from_csv};

use super::open_db;

/// Explicit column overrides from the command line. Any set index takes
/// precedence over header detection.
#[derive(Debug, Default)]
pub struct ColumnOverrides {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub amount: Option<usize>,
    pub source_category: Option<usize>,
}

impl ColumnOverrides {
    fn apply(&self, mut map: ColumnMap) -> ColumnMap {
        if self.date.is_some() {
            map.date = self.date;
        }
        if self.description.is_some() {
            map.description = self.description;
        }
        if self.amount.is_some() {
            map.amount = self.amount;
        }
        if self.source_category.is_some() {
            map.source_category = self.source_category;
        }
        map
    }
}

pub fn cmd_import(
    db_path: &Path,
    file: &Path,
    source_name: &str,
    no_classify: bool,
    overrides: ColumnOverrides,
) -> Result<()> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_file);

    let headers = reader.headers()?.clone();
    let header_refs: Vec<&str> = headers.iter().collect();

    // Detect once on the header, then layer user overrides on top
    let detected = map_columns(&header_refs);
    let map = overrides.apply(detected);
    tracing::debug!(?map, "Column detection result");

    if map.date.is_none() {
        return Err(anyhow!("Could not detect a date column; specify --date-col"));
    }
    if map.description.is_none() {
        return Err(anyhow!(
            "Could not detect a description column; specify --description-col"
        ));
    }
    if map.amount.is_none() {
        return Err(anyhow!(
            "Could not detect an amount column; specify --amount-col"
        ));
    }

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    println!("📥 Importing {} rows from {}...", rows.len(), file.display());
    print_column_summary(&header_refs, &map, &rows);

    let db = open_db(db_path)?;
    let source_id = db.upsert_source(source_name)?;

    // Re-open to parse from the beginning (including header)
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let records = records_from_csv(csv_file, &map, source_id)?;

    let outcome = import_records(&db, &records, None);

    println!("✅ Import complete!");
    println!("   Imported: {}", outcome.imported);
    println!("   Skipped (duplicates): {}", outcome.skipped);
    if !outcome.errors.is_empty() {
        println!("   Errors: {}", outcome.errors.len());
        for error in &outcome.errors {
            println!(
                "   - row {}: {} ({})",
                error.record + 1,
                error.message,
                error.description.as_deref().unwrap_or("?")
            );
        }
    }

    if outcome.imported > 0 && !no_classify {
        println!();
        println!("🏷️  Classifying transactions...");
        let backfill = apply_rules(&db, outcome.imported.max(100))?;
        println!("   Classified: {} transactions", backfill.classified);
        if backfill.unit_assigned > 0 {
            println!("   - Units assigned: {}", backfill.unit_assigned);
        }
        if backfill.category_assigned > 0 {
            println!("   - Categories assigned: {}", backfill.category_assigned);
        }
    }

    Ok(())
}

/// Show what was detected so surprises are visible before anyone trusts
/// the numbers
fn print_column_summary(headers: &[&str], map: &ColumnMap, rows: &[csv::StringRecord]) {
    let samples: Vec<Vec<String>> = rows
        .iter()
        .take(10)
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    let widths = classify_widths(&samples);

    let describe = |index: Option<usize>| match index {
        Some(i) => format!(
            "column {} ({:?}{})",
            i,
            headers.get(i).copied().unwrap_or("?"),
            widths
                .get(i)
                .map(|w| format!(", {:?}", w).to_lowercase())
                .unwrap_or_default()
        ),
        None => "not mapped".to_string(),
    };

    println!("   Date:        {}", describe(map.date));
    println!("   Description: {}", describe(map.description));
    println!("   Amount:      {}", describe(map.amount));
    println!("   Category:    {}", describe(map.source_category));
}
