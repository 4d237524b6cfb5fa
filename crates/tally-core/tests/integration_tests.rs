//! End-to-end tests across import, dedup, classification, and reporting

use chrono::NaiveDate;
use serde_json::json;

use tally_core::db::Database;
use tally_core::models::{MatchMode, NewRule, RuleField, RuleKind};
use tally_core::{apply_rules, import_batch, resolve_period, spending_report, Error};

fn db_with_source() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let source = db.upsert_source("Checking").unwrap();
    (db, source)
}

#[test]
fn test_import_skips_known_fingerprint() {
    let (db, source) = db_with_source();

    // Seed a transaction whose fingerprint is "dup"
    let batch = json!([{
        "date": "2024-01-01",
        "description": "Original",
        "amount": -50.0,
        "source_id": source,
        "hash": "dup"
    }]);
    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 1);

    // Re-submitting the same identity is skipped, not errored
    let batch = json!([{
        "date": "2024-01-15",
        "description": "Test",
        "amount": -50.0,
        "source_id": source,
        "hash": "dup",
        "allowDuplicate": false
    }]);
    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 0);
    assert_eq!(outcome.skipped, 1);
    assert!(outcome.errors.is_empty());

    // The explicit override bypasses the gate; the stored duplicate then
    // trips the UNIQUE constraint and lands in the error list instead
    let batch = json!([{
        "date": "2024-01-15",
        "description": "Test",
        "amount": -50.0,
        "source_id": source,
        "hash": "other",
        "allowDuplicate": true
    }]);
    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 1);
}

#[test]
fn test_record_failure_does_not_abort_batch() {
    let (db, source) = db_with_source();

    // Record 2 reuses record 1's fingerprint with the override set, so the
    // dedup gate lets it through and the insert itself fails. Record 3 must
    // still be attempted.
    let batch = json!([
        {"date": "2024-01-01", "description": "First", "amount": -10.0,
         "source_id": source, "hash": "same"},
        {"date": "2024-01-02", "description": "Second", "amount": -20.0,
         "source_id": source, "hash": "same", "allowDuplicate": true},
        {"date": "2024-01-03", "description": "Third", "amount": -30.0,
         "source_id": source, "hash": "third"},
    ]);

    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 2);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].record, 1);
    assert_eq!(outcome.errors[0].description.as_deref(), Some("Second"));
    assert_eq!(db.count_transactions().unwrap(), 2);
}

#[test]
fn test_empty_batch_is_a_noop() {
    let (db, _) = db_with_source();
    let outcome = import_batch(&db, &json!([]), None).unwrap();
    assert_eq!(outcome.imported, 0);
    assert_eq!(outcome.skipped, 0);
    assert!(outcome.errors.is_empty());
    assert_eq!(db.count_transactions().unwrap(), 0);
}

#[test]
fn test_invalid_envelope_rejected_before_processing() {
    let (db, _) = db_with_source();
    let result = import_batch(&db, &json!({"not": "an array"}), None);
    assert!(matches!(result, Err(Error::InvalidEnvelope(_))));
    assert_eq!(db.count_transactions().unwrap(), 0);
}

#[test]
fn test_validation_errors_are_isolated_per_record() {
    let (db, source) = db_with_source();

    let batch = json!([
        {"date": "not a date", "description": "Bad", "amount": -1.0, "source_id": source},
        {"date": "2024-01-02", "description": "Good", "amount": -2.0, "source_id": source},
        "not even an object",
    ]);

    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(outcome.errors[0].record, 0);
    assert_eq!(outcome.errors[1].record, 2);
}

#[test]
fn test_progress_reports_in_input_order() {
    let (db, source) = db_with_source();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_cb = seen.clone();
    let progress: tally_core::ImportProgressCallback =
        Box::new(move |current, total| seen_cb.lock().unwrap().push((current, total)));

    let batch = json!([
        {"date": "2024-01-01", "description": "A", "amount": -1.0, "source_id": source},
        {"date": "2024-01-02", "description": "B", "amount": -2.0, "source_id": source},
    ]);
    import_batch(&db, &batch, Some(&progress)).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

#[test]
fn test_import_then_classify_then_report() {
    let (db, source) = db_with_source();

    let business = db.create_unit("Business", None).unwrap();
    let household = db
        .create_category("Household", None, None, None, Some(600.0))
        .unwrap();
    let groceries = db
        .create_category("Groceries", None, None, Some(household), None)
        .unwrap();
    let supplies = db
        .create_category("Supplies", None, None, Some(household), None)
        .unwrap();

    db.create_rule(&NewRule {
        kind: RuleKind::Unit,
        field: RuleField::Description,
        mode: MatchMode::Contains,
        pattern: "AWS".into(),
        target_id: business,
        priority: Some(10),
        active: true,
    })
    .unwrap();
    db.create_rule(&NewRule {
        kind: RuleKind::Category,
        field: RuleField::SourceCategory,
        mode: MatchMode::Contains,
        pattern: "Groceries".into(),
        target_id: groceries,
        priority: Some(20),
        active: true,
    })
    .unwrap();
    db.create_rule(&NewRule {
        kind: RuleKind::Category,
        field: RuleField::Description,
        mode: MatchMode::Contains,
        pattern: "HARDWARE".into(),
        target_id: supplies,
        priority: Some(10),
        active: true,
    })
    .unwrap();

    let batch = json!([
        {"date": "2024-01-05", "description": "H-E-B #12", "amount": -100.0,
         "source_id": source, "csv_category": "Merchandise-Groceries"},
        {"date": "2024-01-12", "description": "H-E-B #12", "amount": -50.0,
         "source_id": source, "csv_category": "Merchandise-Groceries"},
        {"date": "2024-01-20", "description": "ACE HARDWARE", "amount": -75.0,
         "source_id": source},
        {"date": "2024-01-22", "description": "AWS BILL", "amount": -10.0,
         "source_id": source},
    ]);
    let outcome = import_batch(&db, &batch, None).unwrap();
    assert_eq!(outcome.imported, 4);

    let backfill = apply_rules(&db, 100).unwrap();
    assert_eq!(backfill.processed, 4);
    assert_eq!(backfill.unit_assigned, 1);
    assert_eq!(backfill.category_assigned, 3);

    let range = resolve_period(
        "custom",
        Some("2024-01-01"),
        Some("2024-01-31"),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    )
    .unwrap();
    let transactions = db.transactions_in_range(range.from, range.to).unwrap();
    let categories = db.get_categories_flat().unwrap();
    let report = spending_report(&transactions, &categories, range, None, None);

    let parent = report
        .categories
        .iter()
        .find(|r| r.category_id == household)
        .unwrap();
    assert_eq!(parent.total_spent, 225.0);
    assert!((parent.budget_utilization.unwrap() - 37.5).abs() < 1e-9);

    // The AWS bill got a unit but no category, so it stays out of the
    // category report
    assert_eq!(report.totals.total_spent, 225.0);
}
