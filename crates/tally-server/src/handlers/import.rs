//! Batch import handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{AppError, AppState};
use tally_core::import::{import_batch, preview_batch, ImportRecord, PreviewRow, RecordError};

/// Request body for import and preview: the transaction list is validated
/// as an array before any record is touched
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub transactions: Value,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: i64,
    pub skipped: i64,
    pub errors: Vec<RecordError>,
}

/// POST /api/transactions/import - Import a batch of transaction payloads
///
/// Partial success is success: individual record failures are reported in
/// `errors` with a 200 status. Only a structurally invalid envelope is a
/// 400, and only a backend fault is a 500.
pub async fn import_transactions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let outcome = import_batch(&state.db, &req.transactions, None)?;

    info!(
        imported = outcome.imported,
        skipped = outcome.skipped,
        errors = outcome.errors.len(),
        "Import batch processed"
    );

    Ok(Json(ImportResponse {
        success: true,
        imported: outcome.imported,
        skipped: outcome.skipped,
        errors: outcome.errors,
    }))
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub rows: Vec<PreviewRow>,
}

/// POST /api/transactions/preview - Normalize a batch without persisting
///
/// Flags records that duplicate an earlier record of the same batch so the
/// upload wizard can warn before committing.
pub async fn preview_transactions(
    State(_state): State<Arc<AppState>>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let items = req
        .transactions
        .as_array()
        .ok_or_else(|| AppError::bad_request("transaction list must be an array"))?;

    let records: Vec<ImportRecord> = items
        .iter()
        .map(|raw| serde_json::from_value(raw.clone()).unwrap_or_default())
        .collect();

    Ok(Json(PreviewResponse {
        rows: preview_batch(&records),
    }))
}
