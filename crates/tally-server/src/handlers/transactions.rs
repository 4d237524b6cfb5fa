//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::reports::parse_range_params;
use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use tally_core::classify::{apply_rules, Assignment, BackfillOutcome, ClassifyView};
use tally_core::db::TransactionQuery;
use tally_core::models::Transaction;

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub source_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub category_id: Option<i64>,
    /// Search query (substring match on the description)
    pub search: Option<String>,
    /// Period preset (current_month, last_month, ...)
    pub period: Option<String>,
    #[serde(alias = "dateFrom")]
    pub from: Option<String>,
    #[serde(alias = "dateTo")]
    pub to: Option<String>,
    /// Sort field (date or amount)
    pub sort: Option<String>,
    /// Sort direction (asc or desc)
    pub order: Option<String>,
    #[serde(default)]
    pub include_ignored: bool,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/transactions - List transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.max(1).min(MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let date_range = parse_range_params(
        params.period.as_deref(),
        params.from.as_deref(),
        params.to.as_deref(),
    )?
    .map(|range| (range.from, range.to));

    let page = state.db.list_transactions(&TransactionQuery {
        source_id: params.source_id,
        unit_id: params.unit_id,
        category_id: params.category_id,
        date_range,
        search: params.search,
        sort_field: params.sort,
        sort_order: params.order,
        include_ignored: params.include_ignored,
        limit,
        offset,
    })?;

    Ok(Json(TransactionResponse {
        transactions: page.rows,
        total: page.total,
        limit,
        offset,
    }))
}

/// POST /api/transactions/:id/ignore - Hide a transaction from reports
pub async fn ignore_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<crate::SuccessResponse>, AppError> {
    state.db.set_ignored(id, true)?;
    Ok(Json(crate::SuccessResponse { success: true }))
}

/// POST /api/transactions/:id/unignore - Restore a transaction to reports
pub async fn unignore_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<crate::SuccessResponse>, AppError> {
    state.db.set_ignored(id, false)?;
    Ok(Json(crate::SuccessResponse { success: true }))
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub assignment: Assignment,
}

/// POST /api/transactions/:id/classify - Classify one transaction and
/// persist whatever the rules assign
pub async fn classify_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let tx = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;

    // Rules are fetched fresh for every call; a fetch failure leaves the
    // transaction untouched rather than half-classified
    let engine = state.db.classifier()?;
    let assignment = engine.classify(&ClassifyView::of(&tx));

    let unit_id = tx.unit_id.or(assignment.unit_id);
    let category_id = tx.category_id.or(assignment.category_id);
    if unit_id != tx.unit_id || category_id != tx.category_id {
        state.db.update_classification(id, unit_id, category_id)?;
    }

    Ok(Json(ClassifyResponse { assignment }))
}

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    #[serde(default = "default_backfill_limit")]
    pub limit: i64,
}

fn default_backfill_limit() -> i64 {
    1000
}

/// POST /api/classify/backfill - Run the rule engine over unclassified
/// transactions
pub async fn backfill_classifications(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BackfillRequest>,
) -> Result<Json<BackfillOutcome>, AppError> {
    let outcome = apply_rules(&state.db, req.limit.max(1))?;
    Ok(Json(outcome))
}
