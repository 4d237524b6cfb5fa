//! Batch transaction import
//!
//! Records are processed strictly in order with per-record failure
//! isolation: one malformed record or one failed insert is recorded in the
//! outcome's error list and the batch moves on. Only a structurally invalid
//! envelope (the record list not being a list) aborts before any record is
//! touched.

use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::columns::ColumnMap;
use crate::db::Database;
use crate::dedup::{self, Decision};
use crate::error::{Error, Result};
use crate::fingerprint::fingerprint;
use crate::models::NewTransaction;

/// One incoming transaction payload, as submitted by the upload wizard or
/// the CLI. Alternate key spellings from older clients are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, alias = "sourceId")]
    pub source_id: Option<i64>,
    #[serde(default, alias = "csv_category", alias = "category")]
    pub source_category: Option<String>,
    #[serde(default, alias = "hash")]
    pub fingerprint: Option<String>,
    #[serde(default, alias = "allowDuplicate")]
    pub allow_duplicate: bool,
    #[serde(default)]
    pub unit_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A failure tied to a single record of a batch
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordError {
    /// Zero-based position in the submitted batch
    pub record: usize,
    pub description: Option<String>,
    pub message: String,
}

/// Final counts for a batch. The counts are authoritative regardless of how
/// many progress notifications were delivered.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ImportOutcome {
    pub imported: i64,
    pub skipped: i64,
    pub errors: Vec<RecordError>,
}

/// Progress callback for long batches: (current, total). Advisory only.
pub type ImportProgressCallback = Box<dyn Fn(i64, i64) + Send + Sync>;

/// Parse a date string in the formats bank exports actually use
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    // %y must come before %Y: chrono's %Y accepts short years, so trying
    // it first would read "01/15/24" as year 24
    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%y", // 01/15/24
        "%m/%d/%Y", // 01/15/2024
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Validation(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, thousands separators,
/// and parenthesized negatives
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Validation(format!("Unable to parse amount: {}", s)))
}

fn amount_from_value(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::Validation(format!("Unable to parse amount: {}", n))),
        Value::String(s) => parse_amount(s),
        other => Err(Error::Validation(format!(
            "Amount must be a number or string, got {}",
            other
        ))),
    }
}

/// Normalize one record into an insertable payload.
///
/// Maps alternate key spellings (handled by the deserializer), normalizes
/// the date to a canonical calendar-day value, and computes the fingerprint
/// when the caller did not supply one.
pub fn normalize_record(record: &ImportRecord) -> Result<NewTransaction> {
    let date_str = record
        .date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("Missing date".into()))?;
    let date = parse_date(date_str)?;

    let description = record
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("Missing description".into()))?
        .to_string();

    let amount = record
        .amount
        .as_ref()
        .ok_or_else(|| Error::Validation("Missing amount".into()))
        .and_then(amount_from_value)?;

    let source_id = record
        .source_id
        .ok_or_else(|| Error::Validation("Missing source id".into()))?;

    let digest = record
        .fingerprint
        .clone()
        .filter(|fp| !fp.is_empty())
        .unwrap_or_else(|| fingerprint(source_id, &date.to_string(), &description, amount));

    Ok(NewTransaction {
        source_id,
        unit_id: record.unit_id,
        category_id: record.category_id,
        date,
        description,
        amount,
        source_category: record
            .source_category
            .clone()
            .filter(|c| !c.trim().is_empty()),
        fingerprint: Some(digest),
        notes: record.notes.clone(),
        tags: record.tags.clone(),
    })
}

/// Import a raw JSON batch: the value must be an array of record objects.
///
/// A non-array envelope is rejected before any record is processed. Every
/// other failure is per-record.
pub fn import_batch(
    db: &Database,
    payload: &Value,
    progress: Option<&ImportProgressCallback>,
) -> Result<ImportOutcome> {
    let items = payload
        .as_array()
        .ok_or_else(|| Error::InvalidEnvelope("transaction list must be an array".into()))?;

    let mut outcome = ImportOutcome::default();
    let total = items.len() as i64;

    for (idx, raw) in items.iter().enumerate() {
        if let Some(cb) = progress {
            cb(idx as i64 + 1, total);
        }
        match serde_json::from_value::<ImportRecord>(raw.clone()) {
            Ok(record) => import_one(db, idx, &record, &mut outcome),
            Err(e) => outcome.errors.push(RecordError {
                record: idx,
                description: None,
                message: format!("Malformed record: {}", e),
            }),
        }
    }

    debug!(
        imported = outcome.imported,
        skipped = outcome.skipped,
        errors = outcome.errors.len(),
        "Batch import complete"
    );
    Ok(outcome)
}

/// Import already-typed records (the CLI path)
pub fn import_records(
    db: &Database,
    records: &[ImportRecord],
    progress: Option<&ImportProgressCallback>,
) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    let total = records.len() as i64;
    for (idx, record) in records.iter().enumerate() {
        if let Some(cb) = progress {
            cb(idx as i64 + 1, total);
        }
        import_one(db, idx, record, &mut outcome);
    }
    outcome
}

fn import_one(db: &Database, idx: usize, record: &ImportRecord, outcome: &mut ImportOutcome) {
    let payload = match normalize_record(record) {
        Ok(p) => p,
        Err(e) => {
            outcome.errors.push(RecordError {
                record: idx,
                description: record.description.clone(),
                message: e.to_string(),
            });
            return;
        }
    };

    let decision = dedup::decide(
        payload.fingerprint.as_deref(),
        record.allow_duplicate,
        |fp| db.get_by_fingerprint(fp).map(|tx| tx.map(|t| t.id)),
    );

    match decision {
        Ok(Decision::Skip) => outcome.skipped += 1,
        Ok(Decision::Proceed) => match db.create_transaction(&payload) {
            Ok(_) => outcome.imported += 1,
            Err(e) => outcome.errors.push(RecordError {
                record: idx,
                description: Some(payload.description.clone()),
                message: e.to_string(),
            }),
        },
        Err(e) => outcome.errors.push(RecordError {
            record: idx,
            description: Some(payload.description.clone()),
            message: e.to_string(),
        }),
    }
}

/// Extract import records from CSV data using a detected column map.
///
/// Cells are carried as raw strings; `normalize_record` does the date and
/// amount parsing later so a bad cell only fails its own record.
pub fn records_from_csv<R: Read>(
    reader: R,
    map: &ColumnMap,
    source_id: i64,
) -> Result<Vec<ImportRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        records.push(ImportRecord {
            date: map.date.and_then(|col| row.get(col)).map(|s| s.to_string()),
            description: map
                .description
                .and_then(|col| row.get(col))
                .map(|s| s.to_string()),
            amount: map
                .amount
                .and_then(|col| row.get(col))
                .map(|s| Value::String(s.to_string())),
            source_id: Some(source_id),
            source_category: map
                .source_category
                .and_then(|col| row.get(col))
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty()),
            ..Default::default()
        });
    }

    debug!("Extracted {} CSV records", records.len());
    Ok(records)
}

/// One row of an import preview
#[derive(Debug, Clone, serde::Serialize)]
pub struct PreviewRow {
    pub record: usize,
    pub date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub fingerprint: Option<String>,
    /// True when an earlier record in the same batch has the same
    /// fingerprint
    pub intra_batch_duplicate: bool,
    pub error: Option<String>,
}

/// Normalize a batch without touching storage, flagging records that
/// duplicate an earlier record of the same batch. This is the pure
/// preview stage of the upload pipeline; committing is a separate call.
pub fn preview_batch(records: &[ImportRecord]) -> Vec<PreviewRow> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| match normalize_record(record) {
            Ok(payload) => {
                let duplicate = payload
                    .fingerprint
                    .as_ref()
                    .map(|fp| !seen.insert(fp.clone()))
                    .unwrap_or(false);
                PreviewRow {
                    record: idx,
                    date: Some(payload.date.to_string()),
                    description: Some(payload.description),
                    amount: Some(payload.amount),
                    fingerprint: payload.fingerprint,
                    intra_batch_duplicate: duplicate,
                    error: None,
                }
            }
            Err(e) => PreviewRow {
                record: idx,
                date: record.date.clone(),
                description: record.description.clone(),
                amount: None,
                fingerprint: None,
                intra_batch_duplicate: false,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(date: &str, description: &str, amount: f64) -> ImportRecord {
        ImportRecord {
            date: Some(date.to_string()),
            description: Some(description.to_string()),
            amount: Some(json!(amount)),
            source_id: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15").unwrap(), expected);
        assert_eq!(parse_date("01/15/2024").unwrap(), expected);
        assert_eq!(parse_date("01/15/24").unwrap(), expected);
        assert!(parse_date("January 15th").is_err());
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("-123.45").unwrap(), -123.45);
        assert_eq!(parse_amount("(100.00)").unwrap(), -100.00);
        assert!(parse_amount("n/a").is_err());
    }

    #[test]
    fn test_normalize_computes_fingerprint() {
        let payload = normalize_record(&record("01/15/2024", "Test", -50.0)).unwrap();
        assert_eq!(payload.date.to_string(), "2024-01-15");
        let fp = payload.fingerprint.unwrap();
        assert_eq!(fp.len(), crate::fingerprint::FINGERPRINT_LEN);

        // Same day in a different export format yields the same digest
        let other = normalize_record(&record("2024-01-15", "Test", -50.0)).unwrap();
        assert_eq!(other.fingerprint.unwrap(), fp);
    }

    #[test]
    fn test_normalize_keeps_supplied_fingerprint() {
        let mut rec = record("2024-01-15", "Test", -50.0);
        rec.fingerprint = Some("dup".to_string());
        let payload = normalize_record(&rec).unwrap();
        assert_eq!(payload.fingerprint.as_deref(), Some("dup"));
    }

    #[test]
    fn test_normalize_rejects_missing_fields() {
        let mut rec = record("2024-01-15", "Test", -50.0);
        rec.date = None;
        assert!(matches!(
            normalize_record(&rec),
            Err(Error::Validation(msg)) if msg.contains("date")
        ));

        let mut rec = record("2024-01-15", "Test", -50.0);
        rec.description = Some("   ".to_string());
        assert!(normalize_record(&rec).is_err());

        let mut rec = record("2024-01-15", "Test", -50.0);
        rec.amount = Some(json!({"bad": true}));
        assert!(normalize_record(&rec).is_err());
    }

    #[test]
    fn test_alternate_key_spellings() {
        let rec: ImportRecord = serde_json::from_value(json!({
            "date": "2024-01-15",
            "description": "Test",
            "amount": "-50.00",
            "source_id": 1,
            "hash": "dup",
            "csv_category": "Groceries",
            "allowDuplicate": true
        }))
        .unwrap();
        assert_eq!(rec.fingerprint.as_deref(), Some("dup"));
        assert_eq!(rec.source_category.as_deref(), Some("Groceries"));
        assert!(rec.allow_duplicate);

        let payload = normalize_record(&rec).unwrap();
        assert_eq!(payload.amount, -50.0);
    }

    #[test]
    fn test_records_from_csv_uses_column_map() {
        let csv = "Transaction Date,Merchant,Debit,Category\n\
                   01/15/2024,NETFLIX.COM,-15.99,Entertainment\n\
                   01/16/2024,STARBUCKS,-5.50,\n";
        let map = crate::columns::map_columns(&["Transaction Date", "Merchant", "Debit", "Category"]);

        let records = records_from_csv(csv.as_bytes(), &map, 7).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description.as_deref(), Some("NETFLIX.COM"));
        assert_eq!(records[0].source_id, Some(7));
        assert_eq!(records[0].source_category.as_deref(), Some("Entertainment"));
        // Empty bank category becomes None, not an empty string
        assert_eq!(records[1].source_category, None);

        let payload = normalize_record(&records[0]).unwrap();
        assert_eq!(payload.amount, -15.99);
        assert_eq!(payload.date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_preview_marks_intra_batch_duplicates() {
        let records = vec![
            record("2024-01-15", "COFFEE", -4.0),
            record("2024-01-16", "LUNCH", -12.0),
            record("2024-01-15", "COFFEE", -4.0),
        ];
        let rows = preview_batch(&records);
        assert!(!rows[0].intra_batch_duplicate);
        assert!(!rows[1].intra_batch_duplicate);
        assert!(rows[2].intra_batch_duplicate);
    }

    #[test]
    fn test_preview_collects_errors_without_aborting() {
        let mut bad = record("garbage", "BAD", -1.0);
        bad.date = Some("garbage".to_string());
        let rows = preview_batch(&[bad, record("2024-01-15", "OK", -1.0)]);
        assert!(rows[0].error.is_some());
        assert!(rows[1].error.is_none());
    }
}
