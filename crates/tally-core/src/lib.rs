//! Tally Core Library
//!
//! Shared functionality for the Tally transaction tracker:
//! - SQLite storage with pooling and migrations
//! - Content-based fingerprints for duplicate detection
//! - Header-driven column mapping for heterogeneous bank exports
//! - Priority-ordered rule engine assigning units and categories
//! - Category forest with cycle-guarded mutations
//! - Spending reports with child-to-parent budget rollup
//! - Batch importer with per-record failure isolation

pub mod classify;
pub mod columns;
pub mod db;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod hierarchy;
pub mod import;
pub mod models;
pub mod report;

pub use classify::{
    apply_rules, pattern_matches, Assignment, BackfillOutcome, ClassificationEngine, ClassifyView,
};
pub use columns::{classify_widths, map_columns, ColumnMap, ColumnWidth, LogicalField};
pub use db::{Database, TransactionPage, TransactionQuery};
pub use dedup::{decide, Decision};
pub use error::{Error, Result};
pub use fingerprint::{fingerprint, FINGERPRINT_LEN};
pub use hierarchy::{build_hierarchy, would_create_cycle, CategoryNode};
pub use import::{
    import_batch, import_records, preview_batch, records_from_csv, ImportOutcome,
    ImportProgressCallback, ImportRecord, PreviewRow, RecordError,
};
pub use report::{resolve_period, spending_report, DateRange, SpendingReport};
